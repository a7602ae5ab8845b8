//! Demo server hosting the query endpoint and the embedded client assets
//!
//! ```bash
//! cargo run --bin querydeck_server --features server
//! curl -s -X POST http://localhost:3000/api/query/fetch \
//!     -H 'Content-Type: application/json' \
//!     -d '{"modelId": "test", "query": {}}'
//! ```

use std::sync::Arc;

use axum::http::header::CONTENT_DISPOSITION;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use querydeck::api::{create_query_router, QueryApiState};
use querydeck::config::ServerConfig;
use querydeck::executor::{PgProbeExecutor, QueryExecutor, StubExecutor};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("querydeck=info,tower_http=debug")),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ServerConfig::default();

    // Tenant routing table
    let resolver = Arc::new(config.build_resolver()?);
    info!(
        routes = resolver.route_count(),
        default = %resolver.default_route(),
        "tenant routing ready"
    );

    // Execution seam: probe the routed database unless stubbed out
    let executor: Arc<dyn QueryExecutor> = if std::env::var("QUERYDECK_STUB_EXECUTOR").is_ok() {
        info!("using stub executor, no database access");
        Arc::new(StubExecutor)
    } else {
        Arc::new(PgProbeExecutor)
    };

    let state = QueryApiState { resolver, executor };

    // API routes, client assets, middleware
    let app = create_query_router(state)
        .fallback_service(ServeDir::new(&config.static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    // The engine's client may be served from another origin
                    // during development; Content-Disposition is exposed so
                    // export downloads keep their filenames.
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                        .expose_headers([CONTENT_DISPOSITION]),
                ),
        );

    info!("Starting server on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

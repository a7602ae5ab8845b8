//! Query API routes
//!
//! ## Endpoints
//!
//! - `POST /api/query/fetch` - resolve the tenant route and execute the query
//! - `GET  /api/health` - liveness check
//!
//! The fetch handler is deliberately thin: resolve, log the route (masked),
//! execute. All tenant knowledge lives in the resolver, all SQL knowledge
//! on the other side of the executor seam.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, error};

use crate::executor::QueryExecutor;
use crate::protocol::{ApiResponse, FetchRequest};
use crate::tenant::TenantResolver;

/// Shared state for the query endpoints
#[derive(Clone)]
pub struct QueryApiState {
    pub resolver: Arc<TenantResolver>,
    pub executor: Arc<dyn QueryExecutor>,
}

/// Build the query API router
pub fn create_query_router(state: QueryApiState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/query/fetch", post(fetch_data))
        .with_state(state)
}

/// GET /api/health - liveness check
async fn health_check() -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok("OK".to_string()))
}

/// POST /api/query/fetch - execute a query against its tenant's database
///
/// The route is resolved from the request's own model id on every call;
/// nothing about the previous request can bleed into this one.
async fn fetch_data(
    State(state): State<QueryApiState>,
    Json(request): Json<FetchRequest>,
) -> Result<Json<ApiResponse<serde_json::Value>>, (StatusCode, String)> {
    let descriptor = state.resolver.resolve(&request.model_id);
    debug!(model_id = %request.model_id, route = %descriptor, "resolved tenant route");

    match state.executor.execute(descriptor, &request).await {
        Ok(data) => Ok(Json(ApiResponse::ok(data))),
        Err(err) => {
            error!(model_id = %request.model_id, error = %err, "query execution failed");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Query execution failed: {err}"),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::StubExecutor;
    use crate::tenant::RoutingConfig;
    use serde_json::json;

    struct FailingExecutor;

    #[async_trait::async_trait]
    impl QueryExecutor for FailingExecutor {
        async fn execute(
            &self,
            _descriptor: &crate::tenant::ConnectionDescriptor,
            _request: &FetchRequest,
        ) -> anyhow::Result<serde_json::Value> {
            anyhow::bail!("connection refused")
        }
    }

    fn demo_state() -> QueryApiState {
        QueryApiState {
            resolver: Arc::new(TenantResolver::from_config(RoutingConfig::local_demo())),
            executor: Arc::new(StubExecutor),
        }
    }

    #[tokio::test]
    async fn test_health_check() {
        let Json(response) = health_check().await;
        assert!(response.success);
        assert_eq!(response.data.as_deref(), Some("OK"));
    }

    #[tokio::test]
    async fn test_fetch_routes_by_the_requests_own_model_id() {
        let state = demo_state();

        let Json(response) = fetch_data(
            State(state.clone()),
            Json(FetchRequest::new("test", json!({}))),
        )
        .await
        .unwrap();
        assert!(response.success);
        assert_eq!(response.data.unwrap()["database"], "postgres");

        let Json(response) = fetch_data(
            State(state),
            Json(FetchRequest::new("unknown-tenant", json!({}))),
        )
        .await
        .unwrap();
        assert_eq!(response.data.unwrap()["database"], "xsiadapter");
    }

    #[tokio::test]
    async fn test_execution_failure_maps_to_500() {
        let state = QueryApiState {
            resolver: Arc::new(TenantResolver::from_config(RoutingConfig::local_demo())),
            executor: Arc::new(FailingExecutor),
        };

        let (status, message) = fetch_data(
            State(state),
            Json(FetchRequest::new("test", json!({}))),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(message.contains("connection refused"));
    }
}

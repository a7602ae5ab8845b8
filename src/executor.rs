//! Server-side query execution seam
//!
//! The external engine owns SQL generation and execution; this crate only
//! decides which database it runs against. [`QueryExecutor`] is the
//! boundary: the endpoint resolves the tenant route and hands descriptor
//! plus request across it. Connections are request-scoped on the other
//! side, opened, used and disposed per fetch.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::protocol::FetchRequest;
use crate::tenant::ConnectionDescriptor;

/// Executes a fetch request against the database a descriptor points at.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Run the query and return the engine-defined result payload.
    async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &FetchRequest,
    ) -> anyhow::Result<Value>;
}

/// Executor that returns an empty result envelope without touching any
/// database. Stands in for the real engine in tests and offline demos.
#[derive(Debug, Clone, Default)]
pub struct StubExecutor;

#[async_trait]
impl QueryExecutor for StubExecutor {
    async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &FetchRequest,
    ) -> anyhow::Result<Value> {
        Ok(json!({
            "modelId": request.model_id,
            "database": descriptor.database,
            "columns": [],
            "rows": [],
        }))
    }
}

/// Executor that opens the routed connection, verifies the database
/// answers, and returns an empty result envelope. Demonstrates the
/// request-scoped connection lifecycle without depending on the real
/// engine's SQL generation.
#[cfg(feature = "database")]
#[derive(Debug, Clone, Default)]
pub struct PgProbeExecutor;

#[cfg(feature = "database")]
#[async_trait]
impl QueryExecutor for PgProbeExecutor {
    async fn execute(
        &self,
        descriptor: &ConnectionDescriptor,
        request: &FetchRequest,
    ) -> anyhow::Result<Value> {
        use sqlx::Connection;

        let mut conn = sqlx::postgres::PgConnection::connect(&descriptor.connection_string())
            .await?;
        sqlx::query("SELECT 1").execute(&mut conn).await?;
        conn.close().await?;

        tracing::debug!(
            model_id = %request.model_id,
            database = %descriptor.database,
            "tenant database probe succeeded"
        );
        Ok(json!({
            "modelId": request.model_id,
            "database": descriptor.database,
            "columns": [],
            "rows": [],
        }))
    }
}

//! Client-side fetch dispatch
//!
//! Builds data-fetch requests from the live session and posts them to the
//! query endpoint. The one piece of logic that matters here is the routing
//! hint: every outgoing request carries its model id in the data bag, so
//! the server can resolve the tenant connection from the request alone.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Mutex;
use std::time::Duration;

use crate::protocol::{ApiResponse, FetchRequest};
use crate::session::QuerySession;
use crate::view::QueryView;

// ============================================================================
// ViewOptions
// ============================================================================

/// Client init options the core cares about. Mirrors the engine's camelCase
/// option object, so hosts can lift these straight out of their existing
/// client config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ViewOptions {
    /// Model the query builder is bound to
    pub model_id: String,

    /// Fallback model when `model_id` is empty
    pub default_model_id: String,

    /// Path prefix of the query endpoint, e.g. `/api/query`
    pub endpoint: String,

    /// Upper bound on the post-restore fetch wait, in milliseconds
    pub fetch_delay_ms: u64,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            model_id: "test".to_string(),
            default_model_id: "test".to_string(),
            endpoint: "/api/query".to_string(),
            fetch_delay_ms: 100,
        }
    }
}

impl ViewOptions {
    /// The fetch wait bound as a `Duration`
    pub fn fetch_delay(&self) -> Duration {
        Duration::from_millis(self.fetch_delay_ms)
    }

    /// The model id requests should carry, falling back to the default
    /// model when none is set.
    pub fn effective_model_id(&self) -> &str {
        if self.model_id.is_empty() {
            &self.default_model_id
        } else {
            &self.model_id
        }
    }
}

// ============================================================================
// FetchDispatcher
// ============================================================================

/// Posts fetch requests to the query endpoint.
pub struct FetchDispatcher {
    http: reqwest::Client,
    base_url: String,
    options: ViewOptions,
}

impl FetchDispatcher {
    /// Dispatcher for the endpoint at `base_url` (scheme and authority,
    /// e.g. `http://localhost:3000`).
    pub fn new(base_url: impl Into<String>, options: ViewOptions) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            options,
        }
    }

    /// Get the configured options
    pub fn options(&self) -> &ViewOptions {
        &self.options
    }

    /// Build the wire request for the session's current query. The routing
    /// hint is stamped before the request ever leaves the client.
    pub fn prepare(&self, session: &QuerySession) -> FetchRequest {
        self.prepare_from_payload(session.payload())
    }

    /// Build the wire request for an arbitrary query payload.
    pub fn prepare_from_payload(&self, payload: &Value) -> FetchRequest {
        FetchRequest::new(self.options.effective_model_id(), payload.clone())
    }

    fn fetch_url(&self) -> String {
        format!(
            "{}{}/fetch",
            self.base_url.trim_end_matches('/'),
            self.options.endpoint
        )
    }

    /// POST the request and unwrap the response envelope down to the
    /// engine-defined result payload.
    pub async fn dispatch(&self, request: &FetchRequest) -> anyhow::Result<Value> {
        let url = self.fetch_url();
        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach query endpoint {url}"))?
            .error_for_status()
            .context("Query endpoint rejected the fetch")?;

        let body: ApiResponse<Value> = response
            .json()
            .await
            .context("Query endpoint returned a malformed response envelope")?;

        if body.success {
            Ok(body.data.unwrap_or(Value::Null))
        } else {
            anyhow::bail!(
                "Fetch rejected by server: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )
        }
    }
}

// ============================================================================
// HttpQueryView
// ============================================================================

/// [`QueryView`] implementation for headless embeddings: widget calls are
/// logged, data fetches go through the dispatcher. Keeps a mirror of the
/// last synced payload so the scheduled fetch can build its request without
/// re-borrowing the session.
pub struct HttpQueryView {
    dispatcher: FetchDispatcher,
    payload: Mutex<Value>,
}

impl HttpQueryView {
    pub fn new(dispatcher: FetchDispatcher) -> Self {
        Self {
            dispatcher,
            payload: Mutex::new(Value::Object(serde_json::Map::new())),
        }
    }

    /// Last payload handed to `sync_query`
    pub fn payload(&self) -> Value {
        self.payload.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl QueryView for HttpQueryView {
    fn refresh_widgets(&self) {
        tracing::debug!("widget refresh requested (headless view)");
    }

    fn sync_query(&self, payload: &Value) {
        *self.payload.lock().unwrap() = payload.clone();
    }

    async fn fetch_data(&self) -> anyhow::Result<()> {
        let request = {
            let payload = self.payload.lock().unwrap();
            self.dispatcher.prepare_from_payload(&payload)
        };
        let result = self.dispatcher.dispatch(&request).await?;
        let result_kind = match &result {
            Value::Object(_) => "object",
            Value::Array(_) => "array",
            _ => "other",
        };
        tracing::debug!(model_id = %request.model_id, result_kind, "data fetch completed");
        Ok(())
    }
}

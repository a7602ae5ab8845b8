//! Wire types shared by the client dispatcher and the server endpoint
//!
//! Field names follow the engine's JSON conventions (camelCase), so a
//! request built here is byte-compatible with what the engine's own client
//! emits.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key under which the tenant routing hint travels in the request data bag.
pub const ROUTING_HINT_KEY: &str = "tenant";

/// A data-fetch request as it crosses the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    /// Id of the data model the query was built against; doubles as the
    /// tenant identifier for connection routing.
    pub model_id: String,

    /// Request-scoped data bag. Engine-defined except for the routing hint
    /// under [`ROUTING_HINT_KEY`].
    #[serde(default)]
    pub data: Map<String, Value>,

    /// Engine-defined query JSON, forwarded verbatim.
    #[serde(default)]
    pub query: Value,
}

impl FetchRequest {
    /// Request for `model_id` carrying `query`, with the routing hint
    /// already stamped into the data bag.
    pub fn new(model_id: impl Into<String>, query: Value) -> Self {
        let model_id = model_id.into();
        let mut data = Map::new();
        data.insert(
            ROUTING_HINT_KEY.to_string(),
            Value::String(model_id.clone()),
        );
        Self {
            model_id,
            data,
            query,
        }
    }

    /// The routing hint currently carried in the data bag, if any.
    pub fn routing_hint(&self) -> Option<&str> {
        self.data.get(ROUTING_HINT_KEY).and_then(Value::as_str)
    }
}

/// Standard response wrapper for API endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

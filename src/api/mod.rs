//! REST API layer
//!
//! Endpoint glue between the engine's client and the tenant-routed
//! execution seam. Compiled only with the `server` feature.

pub mod query_routes;

pub use query_routes::{create_query_router, QueryApiState};

//! querydeck - embed a visual query-builder engine in a web application
//!
//! The engine itself (model loading, SQL generation, widget rendering) is
//! an opaque third-party collaborator. This crate owns the two pieces of
//! custom logic around it:
//!
//! 1. **Client-side session persistence**: the in-progress query survives
//!    page reloads. Every change overwrites one storage slot with a
//!    `{modified, query}` snapshot; on startup the restore coordinator
//!    rehydrates the session and replays the side effect the dirty flag
//!    calls for.
//! 2. **Server-side tenant routing**: each data-fetch request carries a
//!    model id, and the resolver maps it to the connection descriptor for
//!    that tenant's database. Unknown ids fall through to a default route,
//!    so resolution is total.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use querydeck::session::QuerySession;
//! use querydeck::store::{MemorySlotStore, QueryStateStore};
//! use serde_json::json;
//!
//! let store = Arc::new(QueryStateStore::new(MemorySlotStore::new()));
//! let mut session = QuerySession::new();
//! QueryStateStore::attach(&store, &mut session);
//!
//! // Edits persist as they happen; no explicit save step
//! session.apply_edit(json!({"filter": "amount > 100"})).unwrap();
//!
//! let snapshot = store.load().unwrap().unwrap();
//! assert!(snapshot.modified);
//! assert_eq!(snapshot.query, json!({"filter": "amount > 100"}));
//! ```

// Core error handling
pub mod error;

// The live query session and its change-notification contract
pub mod session;

// Durable snapshot persistence
pub mod store;

// Startup restore of the persisted session
pub mod restore;

// Seam to the engine's dependent widgets
pub mod view;

// Tenant connection routing
pub mod tenant;

// Wire types shared by client and server
pub mod protocol;

// Client-side fetch dispatch
pub mod dispatch;

// Server-side execution seam
pub mod executor;

// Server configuration
pub mod config;

// REST API layer (requires the server feature)
#[cfg(feature = "server")]
pub mod api;

// Re-export the main types
pub use dispatch::{FetchDispatcher, HttpQueryView, ViewOptions};
pub use error::{RestoreError, RoutingError, SessionError, StorageError, StoreError};
pub use executor::{QueryExecutor, StubExecutor};
pub use protocol::{ApiResponse, FetchRequest, ROUTING_HINT_KEY};
pub use restore::{RestoreCoordinator, RestoreOutcome, RestorePhase, DEFAULT_FETCH_DELAY};
pub use session::{ChangeEvent, ListenerId, QuerySession};
pub use store::{
    FileSlotStore, MemorySlotStore, QueryStateStore, SlotStore, Snapshot, DEFAULT_SESSION_KEY,
};
pub use tenant::{ConnectionDescriptor, RoutingConfig, TenantResolver};
pub use view::{QueryView, RecordingView, TeardownGuard};

#[cfg(feature = "database")]
pub use executor::PgProbeExecutor;

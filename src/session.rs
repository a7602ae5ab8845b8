//! Query Session Model
//!
//! The live, in-memory representation of the query being edited: an
//! engine-defined JSON payload, a dirty flag tracking unsaved edits, and an
//! explicit change-listener registry. The session itself performs no IO;
//! persistence attaches through the listener seam (see `store`).

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::error::{SessionError, SessionResult};

// ============================================================================
// Change notification
// ============================================================================

/// Notification delivered to registered listeners after a state change.
///
/// Carries a copy of the session state at dispatch time so listeners never
/// need to re-borrow the session from inside the callback.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    /// Dirty flag at the time the notification fired
    pub modified: bool,
    /// Query payload at the time the notification fired
    pub query: Value,
}

/// Handle returned by [`QuerySession::on_change`]; pass it back to
/// [`QuerySession::remove_listener`] to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type ChangeListener = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

struct ListenerEntry {
    id: ListenerId,
    callback: ChangeListener,
}

// ============================================================================
// QuerySession
// ============================================================================

/// The in-progress query a user is building.
///
/// State rules:
/// 1. The payload is opaque engine JSON; the only structural requirement is
///    that it is a JSON object (anything else is not loadable).
/// 2. `modified` flips to true on every edit and back to false only through
///    an explicit [`QuerySession::mark_clean`].
/// 3. Listeners fire on edits and clean marks. Rehydration via
///    [`QuerySession::load_payload`] and [`QuerySession::reset`] is silent;
///    the restore flow decides what to replay.
pub struct QuerySession {
    /// Unique session ID
    id: Uuid,

    /// Engine-defined query definition
    payload: Value,

    /// Whether the payload has unsaved edits
    modified: bool,

    /// Registered change listeners, dispatched in registration order
    listeners: Vec<ListenerEntry>,

    /// Next listener handle to hand out
    next_listener_id: u64,

    /// When this session was created
    created_at: DateTime<Utc>,

    /// When the payload or dirty flag last changed
    last_changed_at: DateTime<Utc>,
}

impl Default for QuerySession {
    fn default() -> Self {
        Self::new()
    }
}

impl QuerySession {
    /// Create a fresh session: empty query object, clean, no listeners
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            payload: Value::Object(Map::new()),
            modified: false,
            listeners: Vec::new(),
            next_listener_id: 1,
            created_at: now,
            last_changed_at: now,
        }
    }

    /// Get the session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the current query payload
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Whether the query has edits not yet marked clean
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    /// When this session was created
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// When the payload or dirty flag last changed
    pub fn last_changed_at(&self) -> DateTime<Utc> {
        self.last_changed_at
    }

    /// Number of registered change listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // ========================================================================
    // State transitions
    // ========================================================================

    /// Apply a user edit: replace the payload, mark the session dirty and
    /// notify listeners. Rejects payloads the engine cannot load; the
    /// session is left untouched in that case.
    pub fn apply_edit(&mut self, payload: Value) -> SessionResult<()> {
        ensure_loadable(&payload)?;
        self.payload = payload;
        self.modified = true;
        self.touch();
        self.dispatch();
        Ok(())
    }

    /// Mark the current payload as in sync with its last execution. Notifies
    /// listeners so the stored snapshot picks up the cleared flag. No-op on
    /// an already clean session.
    pub fn mark_clean(&mut self) {
        if !self.modified {
            return;
        }
        self.modified = false;
        self.touch();
        self.dispatch();
    }

    /// Rehydrate payload and dirty flag from a stored snapshot without
    /// firing listeners. The caller owns any replayed side effects.
    pub fn load_payload(&mut self, payload: Value, modified: bool) -> SessionResult<()> {
        ensure_loadable(&payload)?;
        self.payload = payload;
        self.modified = modified;
        self.touch();
        Ok(())
    }

    /// Fall back to a fresh, empty, clean query. Silent, like
    /// [`QuerySession::load_payload`].
    pub fn reset(&mut self) {
        self.payload = Value::Object(Map::new());
        self.modified = false;
        self.touch();
    }

    /// Re-announce the current state to all listeners without changing it.
    /// Used after restoring a dirty snapshot, where downstream widgets must
    /// react as if the user had just edited the query.
    pub fn fire_changed(&self) {
        self.dispatch();
    }

    // ========================================================================
    // Listener registry
    // ========================================================================

    /// Register a change listener. Listeners fire synchronously, in
    /// registration order, and receive a copy of the session state.
    pub fn on_change<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push(ListenerEntry {
            id,
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a listener. Returns true if the handle was registered.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|entry| entry.id != id);
        self.listeners.len() != before
    }

    fn touch(&mut self) {
        self.last_changed_at = Utc::now();
    }

    fn dispatch(&self) {
        let event = ChangeEvent {
            modified: self.modified,
            query: self.payload.clone(),
        };
        tracing::debug!(
            session = %self.id,
            modified = event.modified,
            listeners = self.listeners.len(),
            "dispatching change notification"
        );
        for entry in &self.listeners {
            (entry.callback)(&event);
        }
    }
}

impl fmt::Debug for QuerySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySession")
            .field("id", &self.id)
            .field("modified", &self.modified)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// The engine's loadability contract: a query definition is a JSON object.
fn ensure_loadable(payload: &Value) -> SessionResult<()> {
    if payload.is_object() {
        Ok(())
    } else {
        Err(SessionError::UnloadablePayload {
            found: value_kind(payload),
        })
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    fn recording_listener() -> (Arc<Mutex<Vec<ChangeEvent>>>, impl Fn(&ChangeEvent)) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        (events, move |event: &ChangeEvent| {
            sink.lock().unwrap().push(event.clone())
        })
    }

    #[test]
    fn test_new_session_is_empty_and_clean() {
        let session = QuerySession::new();
        assert_eq!(session.payload(), &json!({}));
        assert!(!session.is_modified());
        assert_eq!(session.listener_count(), 0);
    }

    #[test]
    fn test_apply_edit_marks_dirty_and_notifies() {
        let mut session = QuerySession::new();
        let (events, listener) = recording_listener();
        session.on_change(listener);

        session.apply_edit(json!({"filter": "amount > 10"})).unwrap();

        assert!(session.is_modified());
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].modified);
        assert_eq!(events[0].query, json!({"filter": "amount > 10"}));
    }

    #[test]
    fn test_apply_edit_rejects_non_object_payload() {
        let mut session = QuerySession::new();
        let (events, listener) = recording_listener();
        session.on_change(listener);

        let err = session.apply_edit(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnloadablePayload { found: "array" }
        ));

        // Session untouched, nothing dispatched
        assert_eq!(session.payload(), &json!({}));
        assert!(!session.is_modified());
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_mark_clean_clears_flag_and_notifies_once() {
        let mut session = QuerySession::new();
        session.apply_edit(json!({"cols": ["a"]})).unwrap();

        let (events, listener) = recording_listener();
        session.on_change(listener);

        session.mark_clean();
        assert!(!session.is_modified());
        assert_eq!(events.lock().unwrap().len(), 1);
        assert!(!events.lock().unwrap()[0].modified);

        // Second mark on a clean session is silent
        session.mark_clean();
        assert_eq!(events.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_load_payload_is_silent() {
        let mut session = QuerySession::new();
        let (events, listener) = recording_listener();
        session.on_change(listener);

        session
            .load_payload(json!({"cols": ["b"]}), true)
            .unwrap();

        assert!(session.is_modified());
        assert_eq!(session.payload(), &json!({"cols": ["b"]}));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_load_payload_rejects_scalar() {
        let mut session = QuerySession::new();
        let err = session.load_payload(json!(42), false).unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnloadablePayload { found: "number" }
        ));
    }

    #[test]
    fn test_fire_changed_reannounces_current_state() {
        let mut session = QuerySession::new();
        session.load_payload(json!({"cols": ["c"]}), true).unwrap();

        let (events, listener) = recording_listener();
        session.on_change(listener);

        session.fire_changed();
        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].modified);
        assert_eq!(events[0].query, json!({"cols": ["c"]}));
    }

    #[test]
    fn test_remove_listener_stops_delivery() {
        let mut session = QuerySession::new();
        let (events, listener) = recording_listener();
        let id = session.on_change(listener);

        assert!(session.remove_listener(id));
        assert!(!session.remove_listener(id));

        session.apply_edit(json!({"x": 1})).unwrap();
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_edit_after_clean_restore_marks_dirty_again() {
        let mut session = QuerySession::new();
        session.load_payload(json!({"cols": []}), false).unwrap();
        assert!(!session.is_modified());

        session.apply_edit(json!({"cols": ["d"]})).unwrap();
        assert!(session.is_modified());
    }

    #[test]
    fn test_session_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<QuerySession>();
    }
}

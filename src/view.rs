//! Seam to the engine's dependent widgets
//!
//! The restore flow needs to poke the surrounding UI (redraw widget panels,
//! re-sync their internal query model, run a data fetch) without knowing
//! anything about the rendering stack. [`QueryView`] is that seam; hosts
//! implement it over their engine bindings, tests use [`RecordingView`].

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Surface the restore coordinator drives on the host UI.
#[async_trait]
pub trait QueryView: Send + Sync {
    /// Redraw dependent widgets (column panel, condition panel) from the
    /// session's current payload.
    fn refresh_widgets(&self);

    /// Re-synchronize the widgets' internal query representation with
    /// `payload` without marking the session dirty.
    fn sync_query(&self, payload: &Value);

    /// Resolves once dependent widgets have finished their own refresh
    /// cycle and a data fetch would target consistent state. The scheduled
    /// fetch bounds its wait on this signal, so a host that never resolves
    /// it still gets a fetch after the configured delay. The default
    /// implementation reports immediately ready.
    async fn widgets_ready(&self) {}

    /// Execute the data fetch against the server.
    async fn fetch_data(&self) -> anyhow::Result<()>;
}

/// Marks a mounted session as torn down so late scheduled work backs off
/// instead of driving widgets that no longer exist.
#[derive(Debug, Clone, Default)]
pub struct TeardownGuard {
    torn_down: Arc<AtomicBool>,
}

impl TeardownGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag the session as torn down. Idempotent.
    pub fn tear_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

/// View that records every interaction instead of rendering anything.
/// Useful for tests and instrumentation.
#[derive(Clone, Default)]
pub struct RecordingView {
    refreshes: Arc<AtomicUsize>,
    fetches: Arc<AtomicUsize>,
    synced: Arc<Mutex<Vec<Value>>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many widget refreshes have been requested
    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// How many data fetches have run
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Payloads handed to `sync_query`, in order
    pub fn synced_payloads(&self) -> Vec<Value> {
        self.synced.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryView for RecordingView {
    fn refresh_widgets(&self) {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
    }

    fn sync_query(&self, payload: &Value) {
        self.synced.lock().unwrap().push(payload.clone());
    }

    async fn fetch_data(&self) -> anyhow::Result<()> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_teardown_guard_is_sticky() {
        let guard = TeardownGuard::new();
        assert!(!guard.is_torn_down());
        guard.tear_down();
        guard.tear_down();
        assert!(guard.is_torn_down());

        // Clones observe the same flag
        let clone = guard.clone();
        assert!(clone.is_torn_down());
    }

    #[tokio::test]
    async fn test_recording_view_counts_interactions() {
        let view = RecordingView::new();
        view.refresh_widgets();
        view.sync_query(&json!({"cols": ["a"]}));
        view.fetch_data().await.unwrap();
        view.fetch_data().await.unwrap();

        assert_eq!(view.refresh_count(), 1);
        assert_eq!(view.fetch_count(), 2);
        assert_eq!(view.synced_payloads(), vec![json!({"cols": ["a"]})]);
    }

    #[tokio::test]
    async fn test_default_readiness_resolves_immediately() {
        let view = RecordingView::new();
        tokio::time::timeout(std::time::Duration::from_millis(10), view.widgets_ready())
            .await
            .expect("default widgets_ready should resolve at once");
    }
}

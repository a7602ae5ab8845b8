//! Session restore at startup
//!
//! Reads the persisted snapshot exactly once, rehydrates the session, and
//! replays the side effect the snapshot's dirty flag calls for:
//!
//! ```text
//!   NotStarted ──▶ load slot
//!                    │
//!        absent ─────┼────────────▶ SnapshotAbsent (fresh session, done)
//!                    │
//!        modified ───┼──▶ SnapshotLoadedModified ──▶ fire change ──▶ Done
//!                    │
//!        clean ──────┴──▶ SnapshotLoadedClean ──▶ refresh + sync
//!                                                 schedule fetch ──▶ Done
//! ```
//!
//! A dirty snapshot means the user had unsaved edits: the change
//! notification is re-fired and downstream listeners (widgets, auto-save)
//! own the reaction. A clean snapshot matches the last executed query, so
//! the coordinator redraws the widgets itself and schedules a one-shot data
//! fetch once they report ready.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{RestoreError, RestoreResult};
use crate::session::QuerySession;
use crate::store::{QueryStateStore, SlotStore, Snapshot};
use crate::view::{QueryView, TeardownGuard};

/// Upper bound on how long the scheduled fetch waits for widget readiness.
pub const DEFAULT_FETCH_DELAY: Duration = Duration::from_millis(100);

/// Where a restore run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    /// `run` has not been called yet
    NotStarted,
    /// No snapshot was stored; nothing to replay
    SnapshotAbsent,
    /// Snapshot loaded and the user had unsaved edits
    SnapshotLoadedModified,
    /// Snapshot loaded and it matches the last executed query
    SnapshotLoadedClean,
    /// Side effects replayed (or the run failed terminally)
    Done,
}

/// What a completed restore did.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Nothing was stored; the session keeps its default state.
    Fresh,
    /// Dirty snapshot restored. The change notification has fired and
    /// downstream listeners own the reaction.
    RestoredModified,
    /// Clean snapshot restored. Widgets were refreshed and a one-shot data
    /// fetch was scheduled.
    RestoredClean {
        /// Handle of the scheduled fetch task, for hosts that want to await
        /// or abort it.
        fetch_task: JoinHandle<()>,
    },
}

/// Drives the restore sequence for one session start.
///
/// One coordinator per mount: a second `run` on the same coordinator fails
/// with [`RestoreError::AlreadyRan`], and a failed run is terminal too.
pub struct RestoreCoordinator<S: SlotStore> {
    store: Arc<QueryStateStore<S>>,
    fetch_delay: Duration,
    phase: RestorePhase,
}

impl<S: SlotStore> RestoreCoordinator<S> {
    pub fn new(store: Arc<QueryStateStore<S>>) -> Self {
        Self {
            store,
            fetch_delay: DEFAULT_FETCH_DELAY,
            phase: RestorePhase::NotStarted,
        }
    }

    /// Override the readiness wait bound. Mostly for tests and embeddings
    /// with slow widget stacks.
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Get the current restore phase
    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    /// Run the restore. Call once, after the engine signals the session is
    /// mounted and listeners are attached.
    ///
    /// On a decode or loadability failure the session falls back to a
    /// fresh, empty query and the error is surfaced; the slot itself is
    /// left untouched for inspection.
    pub async fn run(
        &mut self,
        session: &mut QuerySession,
        view: Arc<dyn QueryView>,
        guard: TeardownGuard,
    ) -> RestoreResult<RestoreOutcome> {
        if self.phase != RestorePhase::NotStarted {
            return Err(RestoreError::AlreadyRan);
        }

        let snapshot = match self.store.load() {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!(error = %err, "stored query snapshot unreadable, starting fresh");
                session.reset();
                self.phase = RestorePhase::Done;
                return Err(err.into());
            }
        };

        let Some(Snapshot { modified, query }) = snapshot else {
            debug!(session = %session.id(), "no stored query snapshot, keeping fresh session");
            self.phase = RestorePhase::SnapshotAbsent;
            return Ok(RestoreOutcome::Fresh);
        };

        if let Err(err) = session.load_payload(query, modified) {
            warn!(error = %err, "stored query payload not loadable, starting fresh");
            session.reset();
            self.phase = RestorePhase::Done;
            return Err(err.into());
        }

        if modified {
            self.phase = RestorePhase::SnapshotLoadedModified;
            debug!(session = %session.id(), "restored dirty query, firing change notification");
            session.fire_changed();
            self.phase = RestorePhase::Done;
            Ok(RestoreOutcome::RestoredModified)
        } else {
            self.phase = RestorePhase::SnapshotLoadedClean;
            debug!(session = %session.id(), "restored clean query, refreshing widgets");
            view.refresh_widgets();
            view.sync_query(session.payload());
            let fetch_task = schedule_fetch(view, guard, self.fetch_delay);
            self.phase = RestorePhase::Done;
            Ok(RestoreOutcome::RestoredClean { fetch_task })
        }
    }
}

/// Spawn the one-shot post-restore fetch.
///
/// Waits for the view's readiness signal, bounded by `delay` so a host that
/// never resolves it still fetches. The teardown guard is checked after the
/// wait; a torn-down session turns the fetch into a logged no-op.
fn schedule_fetch(
    view: Arc<dyn QueryView>,
    guard: TeardownGuard,
    delay: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let _ = tokio::time::timeout(delay, view.widgets_ready()).await;

        if guard.is_torn_down() {
            warn!("scheduled fetch skipped, session torn down before it ran");
            return;
        }
        if let Err(err) = view.fetch_data().await {
            error!(error = %err, "post-restore data fetch failed");
        }
    })
}

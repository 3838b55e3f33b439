//! Dirty-state tracking and render debouncing.
//!
//! ```text
//!            mutation                 window elapses            render ok (latest)
//!   Clean ────────────▶ Dirty ─────────────────────▶ RenderPending ────────────▶ Clean
//!                        ▲  ▲                           │    │
//!                        │  └────── mutation ───────────┘    │ render failed
//!                        └───────────────────────────────────┘
//! ```
//!
//! The scheduler owns no timer task. It keeps one optional deadline that
//! every mutation pushes back; the owner sleeps until [`DirtyScheduler::deadline`]
//! and then calls [`DirtyScheduler::poll_due`]. Render requests carry the
//! snapshot version they were issued for, and only the response for the most
//! recently issued version is ever applied.

use std::fmt;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

/// Default quiet period between the last mutation and the render.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Rendered output matches the current snapshot.
    Clean,
    /// Mutated since the last render; a deadline is (or was) armed.
    Dirty,
    /// A render for the current snapshot is in flight.
    RenderPending,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::RenderPending => "render pending",
        })
    }
}

/// Permission to render the snapshot at `version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTicket {
    pub version: u64,
}

/// What to do with a finished render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Show the output. `clean` is false when newer edits are waiting.
    Apply { clean: bool },
    /// A newer render was issued after this one; drop the output.
    Discard,
    /// The latest render failed; state went back to dirty.
    Failed,
}

#[derive(Debug)]
pub struct DirtyScheduler {
    window: Duration,
    state: SyncState,
    version: u64,
    latest_issued: Option<u64>,
    deadline: Option<Instant>,
    unsaved: bool,
}

impl Default for DirtyScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DirtyScheduler {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            state: SyncState::Clean,
            version: 0,
            latest_issued: None,
            deadline: None,
            unsaved: false,
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Version of the current snapshot.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Record a mutation at `now`: bump the version and restart the window.
    pub fn mark_dirty(&mut self, now: Instant) -> u64 {
        self.version += 1;
        self.state = SyncState::Dirty;
        self.unsaved = true;
        self.deadline = Some(now + self.window);
        trace!(version = self.version, "Debounce window restarted");
        self.version
    }

    /// Issue a render if the window has elapsed by `now`.
    pub fn poll_due(&mut self, now: Instant) -> Option<RenderTicket> {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                self.state = SyncState::RenderPending;
                self.latest_issued = Some(self.version);
                debug!(version = self.version, "Render issued");
                Some(RenderTicket {
                    version: self.version,
                })
            }
            _ => None,
        }
    }

    /// Pull an armed deadline forward to `now`. No-op when nothing is armed.
    pub fn mark_due(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline.as_mut() {
            *deadline = now.min(*deadline);
        }
    }

    /// Settle the render issued for `version`.
    pub fn complete(&mut self, version: u64, succeeded: bool) -> Completion {
        if self.latest_issued != Some(version) {
            debug!(version, latest = ?self.latest_issued, "Discarding stale render");
            return Completion::Discard;
        }

        let current = version == self.version && self.state == SyncState::RenderPending;
        if !succeeded {
            if current {
                self.state = SyncState::Dirty;
            }
            return Completion::Failed;
        }

        if current {
            self.state = SyncState::Clean;
        }
        Completion::Apply { clean: current }
    }

    /// Explicit save or a fresh load.
    pub fn mark_saved(&mut self) {
        self.unsaved = false;
    }

    /// Exit can proceed without asking.
    pub fn can_exit_silently(&self) -> bool {
        !self.unsaved
    }
}

//! Single-flight state machine for the sync engine.
//!
//! This module is pure: it decides whether a sync may start and when the
//! guard is released. sync-client owns the shared state and applies the
//! transitions.
//!
//! ```text
//! Idle ──SyncRequested──► Running ──SyncFinished──► Idle
//!                           │
//!                           └─SyncRequested──► Running (Rejected)
//! ```

/// Engine state. At most one sync runs per engine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No sync in flight.
    #[default]
    Idle,
    /// A sync is in flight.
    Running {
        /// Number of actions submitted to the running sync.
        batch_size: usize,
    },
}

impl EngineState {
    /// Create a new state machine in the Idle state.
    pub fn new() -> Self {
        Self::Idle
    }

    /// Process an event and return the new state plus what happened.
    pub fn on_event(self, event: EngineEvent) -> (Self, Transition) {
        match (self, event) {
            (Self::Idle, EngineEvent::SyncRequested { batch_size }) => {
                (Self::Running { batch_size }, Transition::Started)
            }
            (running @ Self::Running { .. }, EngineEvent::SyncRequested { .. }) => {
                (running, Transition::Rejected)
            }
            (Self::Running { .. }, EngineEvent::SyncFinished) => (Self::Idle, Transition::Released),
            (Self::Idle, EngineEvent::SyncFinished) => (Self::Idle, Transition::Ignored),
        }
    }

    /// Check if a sync is in flight.
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// A caller asked to sync a batch.
    SyncRequested {
        /// Number of actions in the batch.
        batch_size: usize,
    },
    /// The running sync finished, successfully or not.
    SyncFinished,
}

/// Result of applying an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The sync may proceed; the guard is now held.
    Started,
    /// Another sync is in flight; the caller must fail immediately.
    Rejected,
    /// The guard was released.
    Released,
    /// The event had no effect.
    Ignored,
}

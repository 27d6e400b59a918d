//! Runtime status records surfaced by the daemon's status API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::visibility::{CycleMode, VisibilityState};

/// Identifies one viewer bridge connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle phase of a configured exhibit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExhibitPhase {
    /// No bridge has connected for this mount yet
    Waiting,
    /// Bridge connected, viewer still loading
    Initializing,
    /// Nodes resolved, click cycle armed
    Active,
    /// Setup failed; the exhibit stays inactive until the page reloads
    Inert { reason: String },
}

/// Snapshot of one exhibit's runtime state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExhibitStatus {
    pub phase: ExhibitPhase,
    pub state: VisibilityState,
    pub cycle: Option<CycleMode>,
    /// Number of node handles the click cycle operates on
    pub resolved_nodes: usize,
    pub clicks: u64,
    pub session: Option<SessionId>,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_click: Option<DateTime<Utc>>,
}

impl ExhibitStatus {
    /// Status before any bridge has connected
    pub fn waiting() -> Self {
        Self {
            phase: ExhibitPhase::Waiting,
            state: VisibilityState::default(),
            cycle: None,
            resolved_nodes: 0,
            clicks: 0,
            session: None,
            connected_at: None,
            last_click: None,
        }
    }

    /// Record one click at the current time
    pub fn touch_click(&mut self) {
        self.clicks += 1;
        self.last_click = Some(Utc::now());
    }
}

impl Default for ExhibitStatus {
    fn default() -> Self {
        Self::waiting()
    }
}

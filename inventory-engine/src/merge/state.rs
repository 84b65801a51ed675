//! Merge state machine

use serde::Serialize;
use shared::error::{AppError, AppResult};
use std::fmt;

/// Lifecycle of one merge attempt
///
/// ```text
/// Idle → Proposed → Prepared → Executing → Done | Failed
///                 ↘ Blocked  ↗ (once every conflict is resolved)
/// Proposed | Prepared | Blocked → Cancelled
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeState {
    #[default]
    Idle,
    Proposed,
    Prepared,
    Blocked,
    Executing,
    Done,
    Failed,
    Cancelled,
}

impl MergeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeState::Idle => "idle",
            MergeState::Proposed => "proposed",
            MergeState::Prepared => "prepared",
            MergeState::Blocked => "blocked",
            MergeState::Executing => "executing",
            MergeState::Done => "done",
            MergeState::Failed => "failed",
            MergeState::Cancelled => "cancelled",
        }
    }

    /// Allowed transitions
    pub fn can_transition_to(&self, next: MergeState) -> bool {
        use MergeState::*;
        matches!(
            (self, next),
            (Idle | Done | Failed | Cancelled, Proposed)
                | (Idle | Done | Failed | Cancelled | Proposed, Prepared | Blocked)
                | (Prepared | Blocked, Prepared | Blocked)
                | (Prepared, Executing)
                | (Executing, Done | Failed)
                | (Proposed | Prepared | Blocked, Cancelled)
                | (Done | Failed | Cancelled, Idle)
        )
    }

    /// A merge context exists in this state
    pub fn has_context(&self) -> bool {
        matches!(
            self,
            MergeState::Prepared | MergeState::Blocked | MergeState::Executing
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MergeState::Done | MergeState::Failed | MergeState::Cancelled
        )
    }

    /// Checked transition
    pub fn transition(&mut self, next: MergeState) -> AppResult<()> {
        if !self.can_transition_to(next) {
            return Err(AppError::invalid_state(format!(
                "Merge cannot move from {} to {}",
                self, next
            ))
            .with_detail("from", self.as_str())
            .with_detail("to", next.as_str()));
        }
        tracing::debug!(from = %self, to = %next, "Merge state changed");
        *self = next;
        Ok(())
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

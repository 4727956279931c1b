//! Rotation State Machine
//!
//! Tracks the progress of a single secret rotation.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{FailureKind, RotationError, RotationResult};

/// State of a rotation
///
/// # State Transitions
///
/// ```text
/// Validating → Probing → Generating → UpdatingService → WritingSecret → Propagating → Done
///     ↓           ↓          ↓               ↓                ↓
///     → → → → → → → → → Failed(kind) ← ← ← ← ← ← ← ← ← ← ← ← ←
/// ```
///
/// `Propagating` never fails: individual binding failures are recorded and
/// the rotation still reaches `Done`. `Generating` only fails when the
/// operating system entropy source does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationState {
    /// Checking identifiers, lease and metadata
    Validating,

    /// Checking the current credential against the data service
    Probing,

    /// Generating the new credential
    Generating,

    /// Applying the new password to the live login
    UpdatingService,

    /// Writing the new secret version
    WritingSecret,

    /// Updating dependent consumers (best effort)
    Propagating,

    /// Rotation complete
    Done,

    /// Rotation aborted
    Failed(FailureKind),
}

impl RotationState {
    /// Check if transition to the target state is valid
    #[must_use]
    pub fn can_transition_to(&self, target: RotationState) -> bool {
        use RotationState::*;

        match (self, target) {
            // Forward progress
            (Validating, Probing) => true,
            (Probing, Generating) => true,
            (Generating, UpdatingService) => true,
            (UpdatingService, WritingSecret) => true,
            (WritingSecret, Propagating) => true,
            (Propagating, Done) => true,

            // Failure edges
            (Validating, Failed(_)) => true,
            (Probing, Failed(_)) => true,
            (Generating, Failed(FailureKind::EntropyUnavailable)) => true,
            (UpdatingService, Failed(_)) => true,
            (WritingSecret, Failed(_)) => true,

            // Terminal states cannot transition
            (Done, _) => false,
            (Failed(_), _) => false,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Validate and perform state transition
    pub fn transition_to(&self, target: RotationState) -> RotationResult<RotationState> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(RotationError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if state is terminal (no more transitions possible)
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, RotationState::Done | RotationState::Failed(_))
    }

    /// Check if the live service or secret store may already have changed
    #[must_use]
    pub fn has_mutated(&self) -> bool {
        matches!(
            self,
            RotationState::WritingSecret | RotationState::Propagating | RotationState::Done
        )
    }
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationState::Validating => write!(f, "validating"),
            RotationState::Probing => write!(f, "probing"),
            RotationState::Generating => write!(f, "generating"),
            RotationState::UpdatingService => write!(f, "updating_service"),
            RotationState::WritingSecret => write!(f, "writing_secret"),
            RotationState::Propagating => write!(f, "propagating"),
            RotationState::Done => write!(f, "done"),
            RotationState::Failed(kind) => write!(f, "failed({kind})"),
        }
    }
}

//! Approval state machine shared by trip and expense applications.
//!
//! ```text
//! draft ──submit──> pending ──approve──> approved
//!   ^                  │ ────reject───> rejected
//!   │                  └────return───> returned ──submit──> pending
//! ```
//!
//! `approved` and `rejected` are terminal. An application may stay `pending`
//! indefinitely.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, ApprovalTrail, UserId, UserProfile};
use super::error::{ReimbursementError, TransitionError, ValidationError};

/// Lifecycle moves available after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Submit,
    Approve,
    Reject,
    Return,
}

impl Transition {
    pub const fn label(self) -> &'static str {
        match self {
            Transition::Submit => "submit",
            Transition::Approve => "approve",
            Transition::Reject => "reject",
            Transition::Return => "return",
        }
    }

    /// State reached when the move succeeds.
    pub const fn target(self) -> ApplicationStatus {
        match self {
            Transition::Submit => ApplicationStatus::Pending,
            Transition::Approve => ApplicationStatus::Approved,
            Transition::Reject => ApplicationStatus::Rejected,
            Transition::Return => ApplicationStatus::Returned,
        }
    }

    const fn is_decision(self) -> bool {
        !matches!(self, Transition::Submit)
    }

    const fn accepts(self, current: ApplicationStatus) -> bool {
        match self {
            Transition::Submit => current.is_owner_editable(),
            Transition::Approve | Transition::Reject | Transition::Return => {
                matches!(current, ApplicationStatus::Pending)
            }
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Patch applied to the approval columns of an application.
///
/// `expected_status` is the status the engine read before planning the move; a
/// store must refuse the write when the row no longer has that status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalUpdate {
    pub expected_status: ApplicationStatus,
    pub trail: ApprovalTrail,
    pub updated_at: DateTime<Utc>,
}

/// Check that `transition` is legal for the current state and actor, and build
/// the resulting approval columns.
pub fn plan_transition(
    current: &ApprovalTrail,
    owner: &UserId,
    actor: &UserProfile,
    transition: Transition,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<ApprovalUpdate, ReimbursementError> {
    if transition.is_decision() {
        if !actor.role.can_decide() {
            return Err(TransitionError::RoleNotPermitted {
                role: actor.role,
                attempted: transition,
            }
            .into());
        }
    } else if &actor.id != owner {
        return Err(TransitionError::NotOwner {
            attempted: transition,
        }
        .into());
    }

    if !transition.accepts(current.status) {
        return Err(TransitionError::InvalidState {
            current: current.status,
            attempted: transition,
        }
        .into());
    }

    let comment = comment
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty());

    let trail = match transition {
        Transition::Submit => ApprovalTrail {
            status: ApplicationStatus::Pending,
            submitted_at: Some(now),
            approved_at: None,
            approver_id: None,
            approval_comment: None,
        },
        Transition::Approve => ApprovalTrail {
            status: ApplicationStatus::Approved,
            submitted_at: current.submitted_at,
            approved_at: Some(now),
            approver_id: Some(actor.id.clone()),
            approval_comment: comment,
        },
        Transition::Reject => {
            let comment = comment.ok_or(ValidationError::MissingRejectionComment)?;
            ApprovalTrail {
                status: ApplicationStatus::Rejected,
                submitted_at: current.submitted_at,
                approved_at: None,
                approver_id: Some(actor.id.clone()),
                approval_comment: Some(comment),
            }
        }
        Transition::Return => ApprovalTrail {
            status: ApplicationStatus::Returned,
            submitted_at: current.submitted_at,
            approved_at: None,
            approver_id: Some(actor.id.clone()),
            approval_comment: comment,
        },
    };

    Ok(ApprovalUpdate {
        expected_status: current.status,
        trail,
        updated_at: now,
    })
}

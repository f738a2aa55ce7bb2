//! Shift lifecycle state machine
//!
//! Every status change goes through [`transition`]; nothing else assigns
//! `status`. Edits to an approved shift go through [`propose_change`], which
//! parks the edit in `requested_change` until a privileged actor decides on it.
//!
//! | From | Action | To |
//! |------|--------|----|
//! | draft | submit | pending |
//! | pending | approve (privileged) | approved, delta merged |
//! | pending | reject (privileged) | rejected, or approved for a change request |
//! | approved | request_deletion | deletion_requested |
//! | deletion_requested | approve (privileged) | deleted |
//! | deletion_requested | cancel_deletion | approved |
//! | approved | complete (privileged or system) | completed |
//! | deleted | purge (privileged) | purged |

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::actor::{Actor, ActorRole};
use super::id::{ResourceId, ShiftId};
use super::shift::{
    validate_intervals, IntervalError, NewShift, ParseError, ShiftDelta, ShiftRecord, ShiftStatus,
};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransitionError {
    #[error("Cannot {action} a shift that is {status}")]
    InvalidTransition {
        status: ShiftStatus,
        action: &'static str,
    },

    #[error("{actor} may not {action}: {reason}")]
    PermissionDenied {
        actor: ResourceId,
        action: &'static str,
        reason: &'static str,
    },

    #[error("Invalid interval: {0}")]
    InvalidInterval(#[from] IntervalError),

    #[error("Invalid change request: {0}")]
    InvalidDelta(IntervalError),

    #[error("Invalid change request: no fields to change")]
    EmptyDelta,
}

/// An action requested against a shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Submit,
    Approve,
    Reject,
    RequestDeletion,
    CancelDeletion,
    Complete,
    Purge,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::Submit,
        Action::Approve,
        Action::Reject,
        Action::RequestDeletion,
        Action::CancelDeletion,
        Action::Complete,
        Action::Purge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::RequestDeletion => "request_deletion",
            Action::CancelDeletion => "cancel_deletion",
            Action::Complete => "complete",
            Action::Purge => "purge",
        }
    }

    /// Returns true for actions that move a shift into approved, rejected,
    /// deleted, completed or purged
    pub fn requires_privilege(&self) -> bool {
        matches!(
            self,
            Action::Approve | Action::Reject | Action::Complete | Action::Purge
        )
    }

    fn permitted_for(&self, role: ActorRole) -> bool {
        match role {
            ActorRole::Privileged => true,
            ActorRole::System => *self == Action::Complete,
            ActorRole::Staff => !self.requires_privilege(),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('-', "_");
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| ParseError::Unknown {
                kind: "action",
                value: s.to_string(),
            })
    }
}

const NEEDS_PRIVILEGE: &str = "requires the privileged role";
const NOT_OWNER: &str = "the shift belongs to another staff member";

/// Role and ownership checks, run before any state is looked at
fn authorize(
    actor: &Actor,
    action: &'static str,
    role_allowed: bool,
    owner: &ResourceId,
) -> Result<(), TransitionError> {
    if !role_allowed {
        return Err(TransitionError::PermissionDenied {
            actor: actor.id.clone(),
            action,
            reason: NEEDS_PRIVILEGE,
        });
    }
    if !actor.may_act_for(owner) {
        return Err(TransitionError::PermissionDenied {
            actor: actor.id.clone(),
            action,
            reason: NOT_OWNER,
        });
    }
    Ok(())
}

/// Applies `action` to `record` on behalf of `actor`.
///
/// The input is never modified; on success the caller persists the returned
/// record.
pub fn transition(
    record: &ShiftRecord,
    action: Action,
    actor: &Actor,
) -> Result<ShiftRecord, TransitionError> {
    transition_at(record, action, actor, Utc::now())
}

/// [`transition`] with an explicit clock
pub fn transition_at(
    record: &ShiftRecord,
    action: Action,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<ShiftRecord, TransitionError> {
    authorize(
        actor,
        action.as_str(),
        action.permitted_for(actor.role),
        &record.resource_id,
    )?;

    let mut next = record.clone();

    match (record.status, action) {
        (ShiftStatus::Draft, Action::Submit) => {
            next.status = ShiftStatus::Pending;
        }
        (ShiftStatus::Pending, Action::Approve) => {
            if let Some(delta) = next.requested_change.take() {
                next = next.merged_with(&delta);
                next.validate()?;
            }
            next.status = ShiftStatus::Approved;
        }
        (ShiftStatus::Pending, Action::Reject) => {
            // A rejected edit leaves the approved shift in force
            next.status = if next.requested_change.take().is_some() {
                ShiftStatus::Approved
            } else {
                ShiftStatus::Rejected
            };
        }
        (ShiftStatus::Approved, Action::RequestDeletion) => {
            next.status = ShiftStatus::DeletionRequested;
        }
        (ShiftStatus::DeletionRequested, Action::Approve) => {
            next.status = ShiftStatus::Deleted;
            next.requested_change = None;
        }
        (ShiftStatus::DeletionRequested, Action::CancelDeletion) => {
            next.status = ShiftStatus::Approved;
            next.requested_change = None;
        }
        (ShiftStatus::Approved, Action::Complete) => {
            next.status = ShiftStatus::Completed;
        }
        (ShiftStatus::Deleted, Action::Purge) => {
            next.status = ShiftStatus::Purged;
        }
        (status, action) => {
            return Err(TransitionError::InvalidTransition {
                status,
                action: action.as_str(),
            })
        }
    }

    next.updated_at = now;
    Ok(next)
}

/// Proposes an edit to an approved shift.
///
/// The result is a draft carrying `delta`; canonical fields stay as they are
/// until the change is approved.
pub fn propose_change(
    record: &ShiftRecord,
    delta: ShiftDelta,
    actor: &Actor,
) -> Result<ShiftRecord, TransitionError> {
    propose_change_at(record, delta, actor, Utc::now())
}

/// [`propose_change`] with an explicit clock
pub fn propose_change_at(
    record: &ShiftRecord,
    delta: ShiftDelta,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Result<ShiftRecord, TransitionError> {
    const ACTION: &str = "propose a change to";

    authorize(
        actor,
        ACTION,
        actor.role != ActorRole::System,
        &record.resource_id,
    )?;

    if record.status != ShiftStatus::Approved {
        return Err(TransitionError::InvalidTransition {
            status: record.status,
            action: ACTION,
        });
    }

    if delta.is_empty() {
        return Err(TransitionError::EmptyDelta);
    }

    record
        .merged_with(&delta)
        .validate()
        .map_err(TransitionError::InvalidDelta)?;

    let mut next = record.clone();
    next.status = ShiftStatus::Draft;
    next.requested_change = Some(delta);
    next.updated_at = now;
    Ok(next)
}

/// Creates a shift owned by `new.resource_id`, as a draft or, with
/// `submit`, directly pending.
pub fn create_shift(
    new: NewShift,
    actor: &Actor,
    submit: bool,
    now: DateTime<Utc>,
) -> Result<ShiftRecord, TransitionError> {
    authorize(
        actor,
        "create a shift",
        actor.role != ActorRole::System,
        &new.resource_id,
    )?;

    let mut class_slots = new.class_slots;
    class_slots.sort_by_key(|slot| (slot.start_time, slot.end_time));
    validate_intervals(new.start_time, new.end_time, &class_slots)?;

    let mut record = ShiftRecord {
        id: ShiftId::new(&new.resource_id, new.date, now),
        resource_id: new.resource_id,
        display_name: new.display_name,
        date: new.date,
        start_time: new.start_time,
        end_time: new.end_time,
        kind: new.kind,
        subject: new.subject,
        status: if submit {
            ShiftStatus::Pending
        } else {
            ShiftStatus::Draft
        },
        class_slots,
        requested_change: None,
        created_at: now,
        updated_at: now,
    };
    record.normalize_subject();
    Ok(record)
}

/// Completes every approved shift that has ended by `now` on behalf of
/// `actor`, stamping the changed records with `stamp`.
///
/// Only privileged and system actors may sweep, even when nothing is due.
/// Returns only the records that changed.
pub fn complete_elapsed(
    records: &[ShiftRecord],
    actor: &Actor,
    now: NaiveDateTime,
    stamp: DateTime<Utc>,
) -> Result<Vec<ShiftRecord>, TransitionError> {
    if !Action::Complete.permitted_for(actor.role) {
        return Err(TransitionError::PermissionDenied {
            actor: actor.id.clone(),
            action: "complete elapsed shifts",
            reason: NEEDS_PRIVILEGE,
        });
    }

    records
        .iter()
        .filter(|r| r.status == ShiftStatus::Approved && r.ends_at() <= now)
        .map(|r| transition_at(r, Action::Complete, actor, stamp))
        .collect()
}

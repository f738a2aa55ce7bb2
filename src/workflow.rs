//! Lifecycle actions against a store
//!
//! [`Workflow`] fetches a record, runs the pure lifecycle engine on it and
//! writes the result back conditionally on the status it started from. A
//! conflicting write is recomputed from a fresh read a bounded number of
//! times; every other error surfaces unchanged.

use std::fmt;

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::domain::lifecycle::{self, Action};
use crate::domain::{
    Actor, NewShift, ShiftDelta, ShiftFilter, ShiftId, ShiftRecord, ShiftStatus, TransitionError,
};
use crate::storage::{ShiftRepository, StoreError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Error categories shown to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInterval,
    InvalidDelta,
    InvalidTransition,
    PermissionDenied,
    ConflictingWrite,
    NotFound,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidInterval => "invalid_interval",
            ErrorKind::InvalidDelta => "invalid_delta",
            ErrorKind::InvalidTransition => "invalid_transition",
            ErrorKind::PermissionDenied => "permission_denied",
            ErrorKind::ConflictingWrite => "conflicting_write",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::Transition(e) => match e {
                TransitionError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                TransitionError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
                TransitionError::InvalidInterval(_) => ErrorKind::InvalidInterval,
                TransitionError::InvalidDelta(_) | TransitionError::EmptyDelta => {
                    ErrorKind::InvalidDelta
                }
            },
            WorkflowError::Store(e) => match e {
                StoreError::NotFound(_) => ErrorKind::NotFound,
                StoreError::ConflictingWrite { .. } => ErrorKind::ConflictingWrite,
                StoreError::Backend(_) => ErrorKind::Storage,
            },
        }
    }
}

/// Drives lifecycle actions against a [`ShiftRepository`]
pub struct Workflow<'a, R: ShiftRepository + ?Sized> {
    repo: &'a R,
    conflict_retries: u32,
}

impl<'a, R: ShiftRepository + ?Sized> Workflow<'a, R> {
    /// Retries a conflicting write once
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            conflict_retries: 1,
        }
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    /// Creates a shift as a draft, or as pending with `submit`
    pub fn create(
        &self,
        new: NewShift,
        actor: &Actor,
        submit: bool,
    ) -> Result<ShiftRecord, WorkflowError> {
        let record = lifecycle::create_shift(new, actor, submit, Utc::now())?;
        self.repo.write_shift(&record, None)?;
        tracing::debug!(id = %record.id, status = %record.status, "created shift");
        Ok(record)
    }

    /// Applies `action` to the stored shift `id`.
    ///
    /// A purge removes the record from the store; the purged record is
    /// returned for reporting.
    pub fn apply(
        &self,
        id: &ShiftId,
        action: Action,
        actor: &Actor,
    ) -> Result<ShiftRecord, WorkflowError> {
        if action == Action::Purge {
            return self.purge(id, actor);
        }

        let record = self.with_retry(id, |current| lifecycle::transition(current, action, actor))?;
        tracing::debug!(%id, action = action.as_str(), status = %record.status, "applied action");
        Ok(record)
    }

    /// Parks `delta` on the approved shift `id` as a change request
    pub fn propose(
        &self,
        id: &ShiftId,
        delta: ShiftDelta,
        actor: &Actor,
    ) -> Result<ShiftRecord, WorkflowError> {
        let record = self.with_retry(id, |current| {
            lifecycle::propose_change(current, delta.clone(), actor)
        })?;
        tracing::debug!(%id, "proposed change");
        Ok(record)
    }

    /// Completes every approved shift that has ended by `now`.
    ///
    /// Requires a privileged or system actor. Shifts changed concurrently are
    /// skipped; the next sweep picks them up.
    pub fn complete_elapsed(
        &self,
        actor: &Actor,
        now: NaiveDateTime,
    ) -> Result<Vec<ShiftRecord>, WorkflowError> {
        let records = self.repo.fetch_shifts(&ShiftFilter::all())?;
        let due = lifecycle::complete_elapsed(&records, actor, now, Utc::now())?;
        let mut completed = Vec::new();

        for record in due {
            match self.repo.write_shift(&record, Some(ShiftStatus::Approved)) {
                Ok(()) => completed.push(record),
                Err(StoreError::ConflictingWrite { id, found, .. }) => {
                    tracing::warn!(%id, ?found, "shift changed during sweep, skipping");
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(count = completed.len(), "completed elapsed shifts");
        Ok(completed)
    }

    fn purge(&self, id: &ShiftId, actor: &Actor) -> Result<ShiftRecord, WorkflowError> {
        let current = self.repo.fetch_shift(id)?;
        let purged = lifecycle::transition(&current, Action::Purge, actor)?;

        // Deleted only ever moves to purged, so no conditional write is needed
        self.repo.delete_shift(id)?;
        tracing::info!(%id, actor = %actor.id, "purged shift");
        Ok(purged)
    }

    /// Fetch, step, conditional write; recomputes from a fresh read on conflict
    fn with_retry(
        &self,
        id: &ShiftId,
        step: impl Fn(&ShiftRecord) -> Result<ShiftRecord, TransitionError>,
    ) -> Result<ShiftRecord, WorkflowError> {
        let mut attempt = 0;

        loop {
            let current = self.repo.fetch_shift(id)?;
            let next = step(&current)?;

            match self.repo.write_shift(&next, Some(current.status)) {
                Ok(()) => return Ok(next),
                Err(StoreError::ConflictingWrite { .. }) if attempt < self.conflict_retries => {
                    attempt += 1;
                    tracing::warn!(%id, attempt, "conflicting write, recomputing");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

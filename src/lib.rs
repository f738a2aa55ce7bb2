//! shift-board - shift scheduling for a small organization
//!
//! Staff propose shifts, a privileged approver accepts or rejects them, and a
//! timeline lays out each day's shifts per resource without visual overlap.
//! Edits to an approved shift travel as change requests that leave the
//! approved values in force until decided.
//!
//! The engines in [`domain`] are pure; [`storage`] persists records behind
//! [`storage::ShiftRepository`]; [`workflow`] ties the two together with
//! optimistic concurrency.

pub mod domain;
pub mod storage;
pub mod workflow;
pub mod cli;

pub use domain::{Actor, ActorRole, ShiftId, ShiftRecord, ShiftStatus};
pub use workflow::{ErrorKind, Workflow, WorkflowError};

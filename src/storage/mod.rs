//! # Storage Layer
//!
//! Persistence for shift records behind the [`ShiftRepository`] trait.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Shifts | JSONL (one JSON per line) | `.shifts/shifts.jsonl` |
//! | Unreadable lines | JSONL | `.shifts/quarantine.jsonl` |
//! | Config | TOML | `.shifts/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - [`ShiftStore`] holds an `fs2` lock across each read-compare-write
//! - Writes are conditional on the status the caller last saw
//! - All rewrites are atomic (temp file + rename)
//!
//! ## Project Structure
//!
//! ```text
//! .shifts/
//! ├── shifts.jsonl          # All shift records
//! ├── shifts.lock           # Advisory lock file
//! ├── quarantine.jsonl      # Lines that failed validation
//! ├── config.toml           # Project configuration
//! └── .gitignore            # Ignores lock and quarantine
//! ```

mod config;
mod document;
mod jsonl;
mod memory;
mod project;

pub use config::{
    ActorConfig, Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, StoreConfig,
    TimelineConfig,
};
pub use document::{parse_record, DocumentError, ShiftDocument};
pub use jsonl::{LoadedShifts, QuarantinedLine, ShiftStore};
pub use memory::MemoryStore;
pub use project::{Project, ProjectError};

use thiserror::Error;

use crate::domain::{ShiftFilter, ShiftId, ShiftRecord, ShiftStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Shift not found: {0}")]
    NotFound(ShiftId),

    #[error("Shift {id} was changed concurrently (expected {}, found {})", status_label(.expected), status_label(.found))]
    ConflictingWrite {
        id: ShiftId,
        expected: Option<ShiftStatus>,
        found: Option<ShiftStatus>,
    },

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

fn status_label(status: &Option<ShiftStatus>) -> &'static str {
    status.map_or("no record", |s| s.as_str())
}

/// Document store seam for shift records.
///
/// Implementations validate at the boundary: every record they return
/// satisfies the record invariants.
pub trait ShiftRepository {
    /// Records matching `filter`, sorted by date, start time and ID
    fn fetch_shifts(&self, filter: &ShiftFilter) -> Result<Vec<ShiftRecord>, StoreError>;

    /// One record by ID, whatever its status
    fn fetch_shift(&self, id: &ShiftId) -> Result<ShiftRecord, StoreError>;

    /// Writes `record` only if the stored status still equals `expected`.
    ///
    /// `expected == None` means the ID must not exist yet.
    fn write_shift(
        &self,
        record: &ShiftRecord,
        expected: Option<ShiftStatus>,
    ) -> Result<(), StoreError>;

    /// Physically removes a record
    fn delete_shift(&self, id: &ShiftId) -> Result<(), StoreError>;
}

/// Compares the stored status against what the writer last saw
pub(crate) fn check_expected(
    id: &ShiftId,
    current: Option<&ShiftRecord>,
    expected: Option<ShiftStatus>,
) -> Result<(), StoreError> {
    let found = current.map(|r| r.status);
    if found == expected {
        Ok(())
    } else {
        Err(StoreError::ConflictingWrite {
            id: id.clone(),
            expected,
            found,
        })
    }
}

//! JSONL storage for shifts
//!
//! Shifts are stored in `.shifts/shifts.jsonl` with one JSON object per line.
//! A sibling lock file serializes read-compare-write cycles between processes.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;
use serde::Serialize;

use super::document::parse_record;
use super::{check_expected, ShiftRepository, StoreError};
use crate::domain::{ShiftFilter, ShiftId, ShiftRecord, ShiftStatus};

/// A stored line that failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarantinedLine {
    pub line: usize,
    pub reason: String,
    pub raw: String,
}

/// Result of reading the store
#[derive(Debug, Default)]
pub struct LoadedShifts {
    pub records: BTreeMap<ShiftId, ShiftRecord>,
    pub quarantined: Vec<QuarantinedLine>,
}

/// Store for shift data in JSONL format
pub struct ShiftStore {
    path: PathBuf,
}

impl ShiftStore {
    /// Creates a new shift store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".shifts").join("shifts.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    /// Where unreadable lines are moved on the next rewrite
    pub fn quarantine_path(&self) -> PathBuf {
        self.path.with_file_name("quarantine.jsonl")
    }

    fn ensure_parent(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        Ok(())
    }

    /// Opens the lock file and takes a shared or exclusive lock on it.
    /// The lock is released when the returned file is dropped.
    fn acquire(&self, exclusive: bool) -> Result<File> {
        self.ensure_parent()?;
        let lock_path = self.lock_path();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .with_context(|| format!("Failed to open lock file: {}", lock_path.display()))?;

        if exclusive {
            file.lock_exclusive()
                .context("Failed to acquire write lock on shift store")?;
        } else {
            file.lock_shared()
                .context("Failed to acquire read lock on shift store")?;
        }
        Ok(file)
    }

    /// Reads every record, setting aside lines that fail validation
    pub fn load(&self) -> Result<LoadedShifts> {
        if !self.path.exists() {
            return Ok(LoadedShifts::default());
        }
        let _lock = self.acquire(false)?;
        self.read_unlocked()
    }

    fn read_unlocked(&self) -> Result<LoadedShifts> {
        let mut loaded = LoadedShifts::default();
        if !self.path.exists() {
            return Ok(loaded);
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open shift store: {}", self.path.display()))?;
        let reader = BufReader::new(file);

        for (index, line) in reader.lines().enumerate() {
            let line_num = index + 1;
            let line = line.with_context(|| format!("Failed to read line {}", line_num))?;

            if line.trim().is_empty() {
                continue;
            }

            match parse_record(&line) {
                // Later lines win over earlier ones with the same ID
                Ok(record) => {
                    loaded.records.insert(record.id.clone(), record);
                }
                Err(reason) => {
                    tracing::warn!(line = line_num, %reason, "skipping invalid shift record");
                    loaded.quarantined.push(QuarantinedLine {
                        line: line_num,
                        reason,
                        raw: line,
                    });
                }
            }
        }

        Ok(loaded)
    }

    /// Appends set-aside lines to the quarantine file
    fn quarantine(&self, lines: &[QuarantinedLine]) -> Result<()> {
        if lines.is_empty() {
            return Ok(());
        }

        let path = self.quarantine_path();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open quarantine file: {}", path.display()))?;

        let mut writer = BufWriter::new(file);
        for entry in lines {
            let line = serde_json::to_string(entry).context("Failed to serialize quarantine entry")?;
            writeln!(writer, "{}", line).context("Failed to write quarantine entry")?;
        }
        writer.flush().context("Failed to flush quarantine file")?;

        tracing::info!(count = lines.len(), path = %path.display(), "quarantined invalid shift records");
        Ok(())
    }

    fn write_unlocked(&self, records: &BTreeMap<ShiftId, ShiftRecord>) -> Result<()> {
        self.ensure_parent()?;

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            let mut writer = BufWriter::new(&file);

            // BTreeMap keeps the output ordered by ID
            for record in records.values() {
                let line = serde_json::to_string(record).context("Failed to serialize shift")?;
                writeln!(writer, "{}", line).context("Failed to write shift")?;
            }

            writer.flush().context("Failed to flush shift store")?;
        }

        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Runs `change` against the current records under an exclusive lock and
    /// rewrites the file if it succeeds.
    fn modify<T>(
        &self,
        change: impl FnOnce(&mut BTreeMap<ShiftId, ShiftRecord>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _lock = self.acquire(true)?;
        let LoadedShifts {
            mut records,
            quarantined,
        } = self.read_unlocked()?;

        let result = change(&mut records)?;

        // The rewrite drops invalid lines, so keep them elsewhere first
        self.quarantine(&quarantined)?;
        self.write_unlocked(&records)?;
        Ok(result)
    }

    /// Rewrites the store cleanly, moving invalid lines to quarantine.
    ///
    /// Returns the number of records kept.
    pub fn compact(&self) -> Result<usize, StoreError> {
        self.modify(|records| Ok(records.len()))
    }
}

impl ShiftRepository for ShiftStore {
    fn fetch_shifts(&self, filter: &ShiftFilter) -> Result<Vec<ShiftRecord>, StoreError> {
        let loaded = self.load()?;
        Ok(filter.apply(loaded.records.values()))
    }

    fn fetch_shift(&self, id: &ShiftId) -> Result<ShiftRecord, StoreError> {
        let mut loaded = self.load()?;
        loaded
            .records
            .remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    fn write_shift(
        &self,
        record: &ShiftRecord,
        expected: Option<ShiftStatus>,
    ) -> Result<(), StoreError> {
        self.modify(|records| {
            check_expected(&record.id, records.get(&record.id), expected)?;
            records.insert(record.id.clone(), record.clone());
            Ok(())
        })
    }

    fn delete_shift(&self, id: &ShiftId) -> Result<(), StoreError> {
        self.modify(|records| {
            records
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| StoreError::NotFound(id.clone()))
        })
    }
}

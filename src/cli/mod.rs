//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `status` |
//! | Shift | Lifecycle actions | `shift add`, `shift approve`, `shift propose` |
//! | Query | Read-only views | `pending`, `shift list`, `timeline` |
//! | Maintenance | Sweeps and store upkeep | `complete-elapsed`, `compact` |
//!
//! ## Acting Party
//!
//! Every command runs as an actor resolved from `--actor` / `--role`
//! (or `SHIFTS_ACTOR` / `SHIFTS_ROLE`), then the `[actor]` config
//! sections, then `$USER` as staff.
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! shifts --verbose pending
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod query;
mod shift;
mod timeline;

pub use app::{run, ActorArgs, Cli, Commands};
pub use output::{Output, OutputFormat};

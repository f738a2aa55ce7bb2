//! Output formatting for CLI commands
//!
//! Text mode leaves layout to each command; JSON mode prints exactly one
//! document per command on stdout so scripts can parse it. Diagnostics
//! always go to stderr.

use serde::Serialize;

pub use crate::storage::OutputFormat;

pub struct Output {
    format: OutputFormat,
    verbose: bool,
}

impl Output {
    pub fn new(format: OutputFormat, verbose: bool) -> Self {
        Self { format, verbose }
    }

    /// A one-line confirmation; `{"success": true, "message": ...}` in JSON
    pub fn success(&self, message: &str) {
        if self.is_json() {
            self.data(&serde_json::json!({ "success": true, "message": message }));
        } else {
            println!("{}", message);
        }
    }

    /// Prints `data` as compact JSON, or pretty JSON for text callers that
    /// have no table of their own
    pub fn data<T: Serialize + ?Sized>(&self, data: &T) {
        let rendered = match self.format {
            OutputFormat::Text => serde_json::to_string_pretty(data),
            OutputFormat::Json => serde_json::to_string(data),
        };
        match rendered {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "failed to serialize output"),
        }
    }

    /// Warnings go to stderr so JSON on stdout stays parseable
    pub fn warn(&self, message: &str) {
        eprintln!("Warning: {}", message);
    }

    pub fn is_json(&self) -> bool {
        self.format == OutputFormat::Json
    }

    /// Only shown with `--verbose`
    pub fn verbose(&self, message: &str) {
        if self.verbose {
            eprintln!("[verbose] {}", message);
        }
    }

    /// Like [`Output::verbose`], tagged with the command name
    pub fn verbose_ctx(&self, command: &str, message: &str) {
        if self.verbose {
            eprintln!("[verbose:{}] {}", command, message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_mode_is_detected() {
        assert!(Output::new(OutputFormat::Json, false).is_json());
        assert!(!Output::new(OutputFormat::Text, true).is_json());
    }
}

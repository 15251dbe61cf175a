//! Output formatting for CLI commands.
//!
//! Provides abstraction layer for outputting results in text or JSON format.

use anyhow::Result;
use serde::Serialize;
use sigil_core::{AssetManifest, CleanStats};
use std::io::{self, Write};

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Writer for command output with format abstraction.
pub struct OutputWriter {
    format: OutputFormat,
    stdout: io::Stdout,
}

impl OutputWriter {
    /// Create a new OutputWriter.
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            stdout: io::stdout(),
        }
    }

    /// Write output using the configured format.
    ///
    /// The `text_fn` closure is called only in text mode to generate the
    /// human-readable output.
    pub fn write<T: Serialize>(&self, data: &T, text_fn: impl FnOnce() -> String) -> Result<()> {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                writeln!(&self.stdout, "{}", json)?;
            }
            OutputFormat::Text => {
                let text = text_fn();
                if !text.is_empty() {
                    write!(&self.stdout, "{}", text)?;
                }
            }
        }
        Ok(())
    }

    /// Write an error message to stderr.
    ///
    /// In JSON mode, writes a JSON error object with success=false.
    pub fn write_error(&self, error: &anyhow::Error, result_code: u8) {
        match self.format {
            OutputFormat::Json => {
                let error_output = ErrorOutput {
                    success: false,
                    result_code,
                    error: format!("{:#}", error),
                };
                if let Ok(json) = serde_json::to_string_pretty(&error_output) {
                    let _ = writeln!(io::stderr(), "{}", json);
                }
            }
            OutputFormat::Text => {
                let _ = writeln!(io::stderr(), "Error: {:#}", error);
            }
        }
    }
}

// ============================================================================
// Data Transfer Objects (DTOs) for JSON output
// ============================================================================

/// Error output structure.
#[derive(Debug, Serialize)]
pub struct ErrorOutput {
    pub success: bool,
    pub result_code: u8,
    pub error: String,
}

/// Output for `init` command.
#[derive(Debug, Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub result_code: u8,
    pub base_dir: String,
    pub manifest: String,
    pub entries: usize,
}

/// Result of a clean, standalone or after `digest --clean`.
#[derive(Debug, Serialize)]
pub struct CleanInfo {
    pub dry_run: bool,
    pub files_deleted: usize,
    pub bytes_freed: u64,
    pub deleted: Vec<String>,
}

impl CleanInfo {
    pub fn new(stats: CleanStats, dry_run: bool) -> Self {
        Self {
            dry_run,
            files_deleted: stats.files_deleted,
            bytes_freed: stats.bytes_freed,
            deleted: stats.deleted,
        }
    }
}

/// Output for `digest` command.
#[derive(Debug, Serialize)]
pub struct DigestOutput {
    pub success: bool,
    pub result_code: u8,
    pub manifest: String,
    pub files_digested: usize,
    pub bytes_written: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clean: Option<CleanInfo>,
}

/// Output for `clean` command.
#[derive(Debug, Serialize)]
pub struct CleanOutput {
    pub success: bool,
    pub result_code: u8,
    #[serde(flatten)]
    pub clean: CleanInfo,
}

/// Output for `nuke` command.
#[derive(Debug, Serialize)]
pub struct NukeOutput {
    pub success: bool,
    pub result_code: u8,
    pub files_deleted: usize,
    pub manifest_removed: bool,
}

/// Output for `asset` command.
#[derive(Debug, Serialize)]
pub struct AssetOutput {
    pub success: bool,
    pub result_code: u8,
    pub original: String,
    pub fingerprinted: Option<String>,
    pub resolved: String,
}

/// Manifest entry for `ls` command.
#[derive(Debug, Clone, Serialize)]
pub struct EntryInfo {
    pub original: String,
    pub fingerprinted: String,
}

/// Output for `ls` command.
#[derive(Debug, Serialize)]
pub struct LsOutput {
    pub success: bool,
    pub result_code: u8,
    pub manifest: String,
    pub entries: Vec<EntryInfo>,
}

impl LsOutput {
    pub fn new(manifest: String, mapping: &AssetManifest) -> Self {
        Self {
            success: true,
            result_code: 0,
            manifest,
            entries: mapping
                .iter()
                .map(|(original, fingerprinted)| EntryInfo {
                    original: original.to_string(),
                    fingerprinted: fingerprinted.to_string(),
                })
                .collect(),
        }
    }
}

// ABOUTME: Output formatting for CLI feedback.
// ABOUTME: Supports normal, quiet (CI), and JSON output modes.

use serde::Serialize;
use std::io::Write;
use std::time::Instant;

use crate::sync::{RunOutcome, TransferStatus};
use crate::types::ImageRef;

/// Output mode for CLI feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-friendly output with progress messages
    Normal,
    /// Minimal output for CI (only final result)
    Quiet,
    /// JSON lines for scripting
    Json,
}

impl OutputMode {
    /// Pick a mode from the CLI flags. JSON wins over quiet.
    pub fn from_flags(quiet: bool, json: bool) -> Self {
        if json {
            OutputMode::Json
        } else if quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}

/// Handles CLI output based on the configured mode.
pub struct Output {
    mode: OutputMode,
    start_time: Option<Instant>,
}

impl Output {
    pub fn new(mode: OutputMode) -> Self {
        Self {
            mode,
            start_time: None,
        }
    }

    /// Start timing an operation.
    pub fn start_timer(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Get elapsed time since timer started.
    pub fn elapsed_secs(&self) -> f64 {
        self.start_time
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Print a progress message (suppressed in quiet/json mode).
    pub fn progress(&self, message: &str) {
        if self.mode == OutputMode::Normal {
            println!("{message}");
        }
    }

    /// Print a success message with optional timing.
    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => {
                let elapsed = self.elapsed_secs();
                if elapsed > 0.0 {
                    println!("{message} ({:.1}s)", elapsed);
                } else {
                    println!("{message}");
                }
            }
            OutputMode::Quiet => {
                println!("{message}");
            }
            OutputMode::Json => self.emit_stdout(&self.event("success", message)),
        }
    }

    /// Print a warning (suppressed in quiet mode).
    pub fn warning(&self, message: &str) {
        match self.mode {
            OutputMode::Normal => eprintln!("Warning: {message}"),
            OutputMode::Quiet => {}
            OutputMode::Json => self.emit_stderr(&self.event("warning", message)),
        }
    }

    /// Print an error message.
    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                eprintln!("Error: {message}");
            }
            OutputMode::Json => self.emit_stderr(&self.event("error", message)),
        }
    }

    /// Print image references one per line, or as a single JSON array.
    pub fn images<'a>(&self, images: impl IntoIterator<Item = &'a ImageRef>) {
        match self.mode {
            OutputMode::Normal | OutputMode::Quiet => {
                let stdout = std::io::stdout();
                let mut lock = stdout.lock();
                for image in images {
                    let _ = writeln!(lock, "{image}");
                }
            }
            OutputMode::Json => {
                let images: Vec<&ImageRef> = images.into_iter().collect();
                self.emit_stdout(&images);
            }
        }
    }

    /// Report a finished run: one line per transfer, then the summary.
    pub fn report(&self, outcome: &RunOutcome) {
        match self.mode {
            OutputMode::Normal => {
                for image in &outcome.present {
                    println!("  - {image} (already present)");
                }
                for transfer in &outcome.transfers {
                    match &transfer.status {
                        TransferStatus::Pulled => println!("  ✓ {}", transfer.image),
                        TransferStatus::Failed { error } => {
                            eprintln!("  ✗ {}: {}", transfer.image, error)
                        }
                    }
                }
                self.success(&outcome.summary());
            }
            OutputMode::Quiet => {
                for transfer in outcome.failed() {
                    if let TransferStatus::Failed { error } = &transfer.status {
                        eprintln!("{}: {}", transfer.image, error);
                    }
                }
                println!("{}", outcome.summary());
            }
            OutputMode::Json => {
                #[derive(Serialize)]
                struct Report<'a> {
                    event: &'a str,
                    #[serde(flatten)]
                    outcome: &'a RunOutcome,
                    summary: String,
                }
                self.emit_stdout(&Report {
                    event: "outcome",
                    outcome,
                    summary: outcome.summary(),
                });
            }
        }
    }

    fn event<'a>(&self, event: &'a str, message: &'a str) -> JsonEvent<'a> {
        JsonEvent {
            event,
            message,
            duration_secs: if self.start_time.is_some() {
                Some(self.elapsed_secs())
            } else {
                None
            },
        }
    }

    fn emit_stdout<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            println!("{json}");
        }
    }

    fn emit_stderr<T: Serialize>(&self, value: &T) {
        if let Ok(json) = serde_json::to_string(value) {
            eprintln!("{json}");
        }
    }
}

#[derive(Serialize)]
struct JsonEvent<'a> {
    event: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_secs: Option<f64>,
}

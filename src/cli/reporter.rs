//! Human-readable run transcript.
//!
//! Normal output goes to the out stream and is fully suppressed by quiet mode
//! (and by JSON mode, which prints one report object instead). Warnings,
//! per-action failures and fatal errors go to the err stream and are never
//! suppressed.

#![allow(missing_docs)]

use std::io::{self, Stderr, Stdout, Write};

use colored::{ColoredString, Colorize};

use crate::core::config::{ExecutionMode, OutputOptions};
use crate::platform::pal::Volume;
use crate::reclaim::executor::{
    ActionObserver, ActionOutcome, ActionRecord, RunReport, SkipReason,
};
use crate::reclaim::inventory::PoolStatus;
use crate::reclaim::plan::Discovered;

/// Line-oriented transcript writer.
pub struct Reporter<O: Write, E: Write> {
    out: O,
    err: E,
    options: OutputOptions,
}

impl Reporter<Stdout, Stderr> {
    /// Reporter bound to the process's stdout and stderr.
    #[must_use]
    pub fn stdio(options: OutputOptions) -> Self {
        Self::new(io::stdout(), io::stderr(), options)
    }
}

impl<O: Write, E: Write> Reporter<O, E> {
    #[must_use]
    pub fn new(out: O, err: E, options: OutputOptions) -> Self {
        Self { out, err, options }
    }

    /// Give back the underlying streams.
    pub fn into_inner(self) -> (O, E) {
        (self.out, self.err)
    }

    fn transcript_enabled(&self) -> bool {
        !self.options.quiet && !self.options.json
    }

    fn line(&mut self, text: &str) {
        if self.transcript_enabled() {
            let _ = writeln!(self.out, "{text}");
        }
    }

    fn err_line(&mut self, text: &str) {
        let _ = writeln!(self.err, "{text}");
    }

    fn paint(&self, text: &str, style: fn(&str) -> ColoredString) -> String {
        if self.options.color {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn header(&mut self, scope: &str, mode: ExecutionMode, endpoint: &str, pool: &str) {
        let mode_label = match mode {
            ExecutionMode::Simulate => self.paint("dry run", |s| s.yellow().bold()),
            ExecutionMode::Execute => self.paint("force", |s| s.red().bold()),
        };
        self.line(&format!(
            "Reclaiming {scope} on {endpoint} (pool '{pool}', {mode_label})"
        ));
    }

    pub fn discovered(&mut self, item: &Discovered) {
        let text = match item {
            Discovered::Domain(domain) => format!("Found domain {} ({})", domain.name, domain.state),
            Discovered::Volume(volume) => {
                format!("Found volume {} in pool {}", volume.name, volume.pool)
            }
        };
        self.line(&text);
    }

    pub fn protected(&mut self, volume: &Volume) {
        let text = self.paint(&format!("Keeping protected volume {}", volume.name), |s| {
            s.dimmed()
        });
        self.line(&text);
    }

    /// Soft skip of the volume phase.
    pub fn pool_skipped(&mut self, pool: &str, status: &PoolStatus) {
        match status {
            PoolStatus::Present => {}
            PoolStatus::Missing => {
                self.line(&format!("Pool '{pool}' not found; skipping volumes."));
            }
            PoolStatus::Unreadable { details } => {
                self.warn(&format!("pool '{pool}' could not be listed; skipping volumes: {details}"));
            }
        }
    }

    pub fn nothing_found(&mut self) {
        self.line("Nothing to reclaim: no matching domains or volumes found.");
    }

    pub fn note(&mut self, text: &str) {
        self.line(text);
    }

    pub fn warn(&mut self, text: &str) {
        let label = self.paint("warning:", |s| s.yellow().bold());
        self.err_line(&format!("{label} {text}"));
    }

    /// Fatal errors always reach the err stream, quiet or not.
    pub fn fatal(&mut self, text: &str) {
        let label = self.paint("error:", |s| s.red().bold());
        self.err_line(&format!("{label} {text}"));
    }

    pub fn summary(&mut self, report: &RunReport) {
        if report.records.is_empty() {
            return;
        }
        if !report.completed {
            self.warn(&format!(
                "interrupted: {} action(s) were not attempted",
                report.records.len() - report.succeeded() - report.failed()
            ));
        }
        let text = match report.mode {
            ExecutionMode::Simulate => format!(
                "Dry run: {} action(s) planned. Re-run with --force to apply.",
                report.records.len()
            ),
            ExecutionMode::Execute => format!(
                "Done: {} succeeded, {} failed, {} skipped in {:.1}s.",
                report.succeeded(),
                report.failed(),
                report.skipped(),
                report.duration.as_secs_f64()
            ),
        };
        self.line(&text);
    }

    /// Print one JSON document on the out stream (JSON mode, not quiet).
    pub fn json_document(&mut self, payload: &serde_json::Value) {
        if self.options.json && !self.options.quiet {
            let _ = serde_json::to_writer(&mut self.out, payload);
            let _ = writeln!(self.out);
        }
    }
}

impl<O: Write, E: Write> ActionObserver for Reporter<O, E> {
    fn after_action(&mut self, record: &ActionRecord, _mode: ExecutionMode) {
        match &record.outcome {
            ActionOutcome::Skipped {
                reason: SkipReason::DryRun,
            } => {
                let text = self.paint(&format!("[dry-run] would {}", record.action), |s| {
                    s.dimmed()
                });
                self.line(&text);
            }
            ActionOutcome::Skipped {
                reason: SkipReason::Interrupted,
            } => {
                self.line(&format!("[skipped] {} (interrupted)", record.action));
            }
            ActionOutcome::Succeeded => {
                let mark = self.paint("[done]", |s| s.green().bold());
                self.line(&format!("{mark} {}", record.action));
            }
            ActionOutcome::Failed { error, .. } => {
                let mark = self.paint("[failed]", |s| s.red().bold());
                self.err_line(&format!("{mark} {}: {error}", record.action));
            }
        }
    }
}

//! Append-only JSONL activity log with graceful degradation.
//!
//! One JSON object per action outcome plus one summary object per run. Any
//! open or write failure degrades the log to a no-op and is remembered so the
//! caller can warn once; logging never fails a run.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde_json::{Value, json};

use crate::core::config::ExecutionMode;
use crate::reclaim::executor::{ActionObserver, ActionOutcome, ActionRecord, RunReport};
use crate::reclaim::plan::Action;

/// JSONL sink for action outcomes.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    degraded: Option<String>,
}

impl ActivityLog {
    /// Open `path` for appending. Never fails; check [`Self::degraded`].
    #[must_use]
    pub fn open(path: &Path) -> Self {
        let opened = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|()| OpenOptions::new().create(true).append(true).open(path));
        match opened {
            Ok(file) => Self {
                path: path.to_path_buf(),
                writer: Some(BufWriter::new(file)),
                degraded: None,
            },
            Err(e) => Self {
                path: path.to_path_buf(),
                writer: None,
                degraded: Some(format!("cannot open activity log {}: {e}", path.display())),
            },
        }
    }

    /// Where the log is (or would have been) written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Why logging stopped, if it did.
    #[must_use]
    pub fn degraded(&self) -> Option<&str> {
        self.degraded.as_deref()
    }

    /// Append the per-run summary line and flush.
    pub fn log_summary(&mut self, scope: &str, report: &RunReport) {
        let line = json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "run_summary",
            "mode": report.mode,
            "scope": scope,
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "skipped": report.skipped(),
            "completed": report.completed,
            "duration_secs": report.duration.as_secs_f64(),
        });
        self.append(&line);
        let flushed = self.writer.as_mut().map_or(Ok(()), Write::flush);
        if let Err(e) = flushed {
            self.degrade(&e);
        }
    }

    fn append(&mut self, line: &Value) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = serde_json::to_writer(&mut *writer, line)
            .map_err(std::io::Error::from)
            .and_then(|()| writer.write_all(b"\n"));
        if let Err(e) = result {
            self.degrade(&e);
        }
    }

    fn degrade(&mut self, err: &std::io::Error) {
        self.writer = None;
        self.degraded = Some(format!(
            "activity log {} disabled after write failure: {err}",
            self.path.display()
        ));
    }
}

impl ActionObserver for ActivityLog {
    fn after_action(&mut self, record: &ActionRecord, mode: ExecutionMode) {
        let pool = match &record.action {
            Action::DeleteVolume { pool, .. } => Some(pool.as_str()),
            _ => None,
        };
        let (outcome, code, error) = match &record.outcome {
            ActionOutcome::Succeeded => ("succeeded", None, None),
            ActionOutcome::Failed { code, error } => ("failed", Some(code.as_str()), Some(error.as_str())),
            ActionOutcome::Skipped { .. } => ("skipped", None, None),
        };
        let line = json!({
            "ts": Utc::now().to_rfc3339(),
            "event": "action",
            "seq": record.seq,
            "mode": mode,
            "action": record.action.verb(),
            "target": record.action.target(),
            "pool": pool,
            "outcome": outcome,
            "code": code,
            "error": error,
        });
        self.append(&line);
    }
}

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal).
    Warning,
    /// Error-level event (the run was aborted).
    Error,
    /// Critical error (the source could not be opened or read).
    Critical,
}

/// Context about a parser run.
#[derive(Debug, Clone)]
pub struct ParseContext {
    /// Description of the row source (usually its path).
    pub source: String,
}

/// Counters reported when a run completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Non-blank data rows encountered.
    pub rows: usize,
    /// Rows that made it into `cleaned_data`.
    pub cleaned: usize,
    /// Rows dropped because of errors or hook vetoes.
    pub dropped: usize,
    /// Total collected error records.
    pub errors: usize,
}

/// Observer interface for parser outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait ParseObserver: Send + Sync {
    /// Called when a run completes without a fatal error (data errors may still be present).
    fn on_success(&self, _ctx: &ParseContext, _stats: ParseStats) {}

    /// Called when a run is aborted by a fatal error.
    fn on_failure(&self, _ctx: &ParseContext, _severity: ParseSeverity, _message: &str) {}

    /// Called when a fatal error meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        self.on_failure(ctx, severity, message)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ParseObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ParseObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ParseObserver for CompositeObserver {
    fn on_success(&self, ctx: &ParseContext, stats: ParseStats) {
        for o in &self.observers {
            o.on_success(ctx, stats);
        }
    }

    fn on_failure(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        for o in &self.observers {
            o.on_failure(ctx, severity, message);
        }
    }

    fn on_alert(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        for o in &self.observers {
            o.on_alert(ctx, severity, message);
        }
    }
}

/// Logs parser outcomes to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ParseObserver for StdErrObserver {
    fn on_success(&self, ctx: &ParseContext, stats: ParseStats) {
        eprintln!(
            "[import][ok] source={} rows={} cleaned={} dropped={} errors={}",
            ctx.source, stats.rows, stats.cleaned, stats.dropped, stats.errors
        );
    }

    fn on_failure(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        eprintln!("[import][{severity:?}] source={} err={message}", ctx.source);
    }

    fn on_alert(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        eprintln!("[ALERT][import][{severity:?}] source={} err={message}", ctx.source);
    }
}

/// Appends parser outcomes to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ParseObserver for FileObserver {
    fn on_success(&self, ctx: &ParseContext, stats: ParseStats) {
        self.append_line(&format!(
            "{} ok source={} rows={} cleaned={} dropped={} errors={}",
            unix_ts(),
            ctx.source,
            stats.rows,
            stats.cleaned,
            stats.dropped,
            stats.errors
        ));
    }

    fn on_failure(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        self.append_line(&format!(
            "{} fail severity={severity:?} source={} err={message}",
            unix_ts(),
            ctx.source
        ));
    }

    fn on_alert(&self, ctx: &ParseContext, severity: ParseSeverity, message: &str) {
        self.append_line(&format!(
            "{} ALERT severity={severity:?} source={} err={message}",
            unix_ts(),
            ctx.source
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

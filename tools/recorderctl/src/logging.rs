//! JSONL run log.
//!
//! A single process-wide logger is installed by `init_run_logger`; until then
//! `append_run_log` is a no-op, so library code can log unconditionally.

use crate::config::LoggingConfig;
use crate::errors::RecorderctlError;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;
const ROTATE_FRACTION: u64 = 4;

#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: 4096,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn from_config(cfg: &LoggingConfig) -> Option<Self> {
        let path = cfg.path.as_ref()?;
        Some(Self {
            path: path.clone(),
            max_payload_bytes: cfg.max_payload_bytes,
            budget_bytes: cfg.budget_bytes,
        })
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), RecorderctlError> {
        fs::create_dir_all(self.log_dir()).map_err(|e| RecorderctlError::Io(e.to_string()))?;
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncate_json(event.payload.clone(), self.max_payload_bytes),
        })
        .map_err(|e| RecorderctlError::Serialization(e.to_string()))?;

        self.rotate_if_full(line.len() as u64 + 1)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| RecorderctlError::Io(e.to_string()))?;
        writeln!(file, "{line}").map_err(|e| RecorderctlError::Io(e.to_string()))?;

        self.prune_rotated()?;
        Ok(())
    }

    /// Moves the live log aside as `<stem>.<nanos>.<ext>` once it would grow
    /// past a quarter of the budget.
    fn rotate_if_full(&self, incoming: u64) -> Result<(), RecorderctlError> {
        let current = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(_) => return Ok(()),
        };
        if current == 0 || current + incoming <= self.budget_bytes / ROTATE_FRACTION {
            return Ok(());
        }
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default();
        let (stem, ext) = self.name_parts();
        let rotated = match ext {
            Some(ext) => format!("{stem}.{nanos}.{ext}"),
            None => format!("{stem}.{nanos}"),
        };
        fs::rename(&self.path, self.log_dir().join(rotated))
            .map_err(|e| RecorderctlError::Io(e.to_string()))
    }

    /// Deletes this logger's rotated files, oldest first, until the live log
    /// and its rotations fit `budget_bytes`. Other files in the directory are
    /// never counted or touched, and the live log is never deleted.
    pub fn prune_rotated(&self) -> Result<Vec<PathBuf>, RecorderctlError> {
        let mut owned = fs::read_dir(self.log_dir())
            .map_err(|e| RecorderctlError::Io(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| self.owns(&entry.path()))
            .filter_map(|entry| {
                let meta = entry.metadata().ok()?;
                meta.is_file()
                    .then(|| (entry.path(), meta.len(), meta.modified().ok()))
            })
            .collect::<Vec<_>>();
        owned.sort_by(|a, b| a.2.cmp(&b.2));

        let mut total = owned.iter().map(|(_, len, _)| *len).sum::<u64>();
        let mut deleted = Vec::new();
        for (path, len, _) in owned {
            if total <= self.budget_bytes {
                break;
            }
            if path.file_name() == self.path.file_name() {
                continue;
            }
            fs::remove_file(&path).map_err(|e| RecorderctlError::Io(e.to_string()))?;
            total = total.saturating_sub(len);
            deleted.push(path);
        }
        Ok(deleted)
    }

    /// `run.jsonl` owns itself and `run*.jsonl`.
    fn owns(&self, candidate: &Path) -> bool {
        let (stem, ext) = self.name_parts();
        let Some(name) = candidate.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        match ext {
            Some(ext) => name.starts_with(stem) && name.ends_with(&format!(".{ext}")),
            None => name == stem || name.starts_with(&format!("{stem}.")),
        }
    }

    fn name_parts(&self) -> (&str, Option<&str>) {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let ext = self.path.extension().and_then(|s| s.to_str());
        (stem, ext)
    }

    fn log_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

static RUN_LOGGER: OnceLock<Mutex<Option<JsonlLogger>>> = OnceLock::new();

fn logger_slot() -> &'static Mutex<Option<JsonlLogger>> {
    RUN_LOGGER.get_or_init(|| Mutex::new(None))
}

pub fn init_run_logger(logger: JsonlLogger) {
    if let Ok(mut slot) = logger_slot().lock() {
        *slot = Some(logger);
    }
}

pub fn clear_run_logger() {
    if let Ok(mut slot) = logger_slot().lock() {
        *slot = None;
    }
}

/// Best effort: a failing log write never fails the command.
pub fn append_run_log(level: &str, event_type: &str, payload: Value) {
    let logger = match logger_slot().lock() {
        Ok(slot) => slot.clone(),
        Err(_) => return,
    };
    if let Some(logger) = logger {
        let _ = logger.append(&LogEvent {
            level,
            event_type,
            payload,
        });
    }
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

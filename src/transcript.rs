//! Step transcript for run transparency.
//!
//! Entries are appended to a caller-chosen file as newline-delimited JSON:
//!
//! ```jsonl
//! {"schema_version":1,"ts":1768300000000,"step":"forecast","duration_ms":4200,"outcome":"success"}
//! {"schema_version":1,"ts":1768300004200,"step":"ethics","duration_ms":3100,"outcome":"failed","error_kind":"parse","error":"Failed to parse ethics report","raw_preview":"Sure! Here..."}
//! ```
use crate::report::ErrorKind;
use crate::steps::{StepError, StepKind};
use crate::util::truncate_string;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const TRANSCRIPT_SCHEMA_VERSION: u32 = 1;

const RAW_PREVIEW_BYTES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Success,
    Failed,
}

/// One executed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub schema_version: u32,

    /// Unix timestamp in milliseconds when the record was written.
    pub ts: u64,

    pub step: StepKind,

    pub duration_ms: u64,

    pub outcome: StepOutcome,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// First ~500 bytes of an unparseable completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_preview: Option<String>,
}

impl StepRecord {
    pub fn succeeded(step: StepKind, duration: Duration) -> Self {
        Self::build(step, duration, StepOutcome::Success, None)
    }

    pub fn failed(step: StepKind, duration: Duration, err: &StepError) -> Self {
        Self::build(step, duration, StepOutcome::Failed, Some(err))
    }

    fn build(
        step: StepKind,
        duration: Duration,
        outcome: StepOutcome,
        err: Option<&StepError>,
    ) -> Self {
        Self {
            schema_version: TRANSCRIPT_SCHEMA_VERSION,
            ts: now_epoch_ms(),
            step,
            duration_ms: duration.as_millis() as u64,
            outcome,
            error_kind: err.map(|err| err.kind),
            error: err.map(|err| err.message.clone()),
            raw_preview: err
                .and_then(|err| err.raw.as_deref())
                .map(|raw| truncate_string(raw, RAW_PREVIEW_BYTES)),
        }
    }
}

/// Append-only JSONL transcript file.
#[derive(Debug, Clone)]
pub struct Transcript {
    path: PathBuf,
}

impl Transcript {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &StepRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("create transcript directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open transcript for append: {}", self.path.display()))?;
        let line = serde_json::to_string(record).context("serialize transcript entry")?;
        writeln!(file, "{line}").context("write transcript entry")?;
        Ok(())
    }

    /// Read every record; blank lines are skipped.
    pub fn load(&self) -> Result<Vec<StepRecord>> {
        let file = fs::File::open(&self.path)
            .with_context(|| format!("open transcript {}", self.path.display()))?;
        let mut records = Vec::new();
        for (idx, line) in BufReader::new(file).lines().enumerate() {
            let line = line.context("read transcript line")?;
            if line.trim().is_empty() {
                continue;
            }
            let record: StepRecord = serde_json::from_str(&line)
                .with_context(|| format!("parse transcript line {}", idx + 1))?;
            records.push(record);
        }
        Ok(records)
    }
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

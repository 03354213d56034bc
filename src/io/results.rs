//! Analytics result log - appends computed reports to a file
//!
//! Results are written in JSONL format (one JSON object per line), keeping a
//! history of what each dashboard request returned.

use crate::domain::types::{AnalysisKind, DateRange, StoreId};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable)
pub fn new_uuid_v7() -> String {
    Uuid::now_v7().to_string()
}

/// One persisted analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsResult {
    pub id: String,
    pub store_id: StoreId,
    #[serde(rename = "type")]
    pub kind: AnalysisKind,
    pub date_range_start: Option<NaiveDateTime>,
    pub date_range_end: Option<NaiveDateTime>,
    pub payload_json: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AnalyticsResult {
    pub fn new(
        store_id: StoreId,
        kind: AnalysisKind,
        date_range: &DateRange,
        payload_json: serde_json::Value,
    ) -> Self {
        Self {
            id: new_uuid_v7(),
            store_id,
            kind,
            date_range_start: date_range.start,
            date_range_end: date_range.end,
            payload_json,
            created_at: Utc::now(),
        }
    }
}

/// Append-only writer for analytics results
pub struct ResultLog {
    file_path: String,
}

impl ResultLog {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "result_log_initialized");
        Self { file_path: file_path.to_string() }
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Write a result to the log file
    /// Returns true if successful, false otherwise
    pub fn write_result(&self, result: &AnalyticsResult) -> bool {
        let line = match serde_json::to_string(result) {
            Ok(line) => line,
            Err(e) => {
                error!(id = %result.id, error = %e, "result_serialize_failed");
                return false;
            }
        };

        match self.append_line(&line) {
            Ok(()) => {
                info!(
                    id = %result.id,
                    store_id = %result.store_id,
                    kind = %result.kind.as_str(),
                    "result_logged"
                );
                true
            }
            Err(e) => {
                error!(id = %result.id, error = %e, "result_log_failed");
                false
            }
        }
    }

    /// Append a line to the log file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "result_written");

        Ok(())
    }
}

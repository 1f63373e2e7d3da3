//! Access log format module
//!
//! One record per streamed request, rendered as:
//! - `combined` (Apache/Nginx-like line extended with the served range and outcome)
//! - `json` (one JSON object per line)

use crate::config::AccessLogFormat;
use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};

/// Access record for one request
#[derive(Debug, Clone, Serialize)]
pub struct AccessRecord {
    /// Client IP address and port
    pub remote_addr: String,
    #[serde(serialize_with = "serialize_time")]
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    pub status: u16,
    /// Served `Content-Range` value, when a range was planned
    pub content_range: Option<String>,
    /// Body bytes actually handed to the client
    pub bytes_sent: u64,
    /// Transfer outcome (`completed`, `sink_error`, `fetch_error`, `cancelled`)
    /// or why no transfer ran (`head`, `not_found`, `unavailable`, `range_not_satisfiable`)
    pub outcome: &'static str,
    pub user_agent: Option<String>,
    /// Time from request to terminal outcome in microseconds
    pub duration_us: u64,
}

impl AccessRecord {
    /// Create a record stamped with the current time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            status: 200,
            content_range: None,
            bytes_sent: 0,
            outcome: "completed",
            user_agent: None,
            duration_us: 0,
        }
    }

    pub fn format(&self, format: AccessLogFormat) -> String {
        match format {
            AccessLogFormat::Combined => self.format_combined(),
            AccessLogFormat::Json => self.format_json(),
        }
    }

    /// `$remote_addr - - [$time_local] "$method $path" $status $bytes "$range" $outcome "$user_agent" $seconds`
    fn format_combined(&self) -> String {
        #[allow(clippy::cast_precision_loss)]
        let seconds = self.duration_us as f64 / 1_000_000.0;
        format!(
            "{} - - [{}] \"{} {}\" {} {} \"{}\" {} \"{}\" {seconds:.3}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.method,
            self.path,
            self.status,
            self.bytes_sent,
            self.content_range.as_deref().unwrap_or("-"),
            self.outcome,
            self.user_agent.as_deref().unwrap_or("-"),
        )
    }

    fn format_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }
}

fn serialize_time<S: Serializer>(time: &DateTime<Local>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.to_rfc3339())
}

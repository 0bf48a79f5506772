use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::monitoring::types::ProbeStatus;

/// Storage format of log timestamps: naive UTC, lexically sortable
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Registered endpoint, read by the scheduler every cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i64,
    pub url: String,
    pub check_interval: u64,
    pub expected_text: Option<String>,
    pub enabled: bool,
}

impl Site {
    /// Expected text only when it carries something to match
    pub fn content_check(&self) -> Option<&str> {
        self.expected_text.as_deref().filter(|text| !text.trim().is_empty())
    }
}

/// Input for registering a site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSite {
    pub url: String,
    pub check_interval: u64,
    pub expected_text: Option<String>,
}

/// One stored row of the `logs` table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub id: i64,
    pub site_id: i64,
    pub status: ProbeStatus,
    /// Seconds
    pub response_time: Option<f64>,
    pub timestamp: String,
}

/// A site joined with its latest probe and uptime ratio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteOverview {
    #[serde(flatten)]
    pub site: Site,
    pub status: Option<ProbeStatus>,
    pub response_time: Option<f64>,
    pub timestamp: Option<String>,
    pub uptime_percent: Option<f64>,
}

/// One point of the response-time chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    /// `YYYY-MM-DD HH:MM:SS`
    pub x: String,
    /// Seconds rounded to milliseconds, `None` for failed probes
    pub y: Option<f64>,
}

impl From<&LogRecord> for ChartPoint {
    fn from(record: &LogRecord) -> Self {
        let x = parse_timestamp(&record.timestamp)
            .map(|time| time.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| record.timestamp.clone());
        let y = record.response_time.map(|seconds| (seconds * 1000.0).round() / 1000.0);
        Self { x, y }
    }
}

pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

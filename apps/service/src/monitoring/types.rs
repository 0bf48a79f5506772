use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Error;

/// Status of a probe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeStatus {
    Up,
    Down,
}

impl ProbeStatus {
    /// Column value in the `logs` table
    pub fn as_i64(self) -> i64 {
        match self {
            ProbeStatus::Up => 1,
            ProbeStatus::Down => 0,
        }
    }

    pub fn from_i64(value: i64) -> Self {
        if value == 1 { ProbeStatus::Up } else { ProbeStatus::Down }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "up"),
            ProbeStatus::Down => write!(f, "down"),
        }
    }
}

/// Outcome of probing one site once
#[derive(Debug)]
pub struct ProbeResult {
    /// Identifier of the site that was probed
    pub site_id: i64,

    /// URL that was requested
    pub url: String,

    /// When the probe finished
    pub timestamp: DateTime<Utc>,

    pub status: ProbeStatus,

    /// Wall-clock time from request to full response, none if nothing came back
    pub response_time: Option<Duration>,

    /// Why the site was classified down
    pub failure: Option<Error>,
}

impl ProbeResult {
    /// Mark the probe as successful
    pub fn success(site_id: i64, url: String, response_time: Duration) -> Self {
        Self {
            site_id,
            url,
            timestamp: Utc::now(),
            status: ProbeStatus::Up,
            response_time: Some(response_time),
            failure: None,
        }
    }

    /// Mark the probe as failed, keeping any duration the failure measured
    pub fn failure(site_id: i64, url: String, error: Error) -> Self {
        Self {
            site_id,
            url,
            timestamp: Utc::now(),
            status: ProbeStatus::Down,
            response_time: error.response_time(),
            failure: Some(error),
        }
    }

    pub fn is_up(&self) -> bool {
        self.status == ProbeStatus::Up
    }

    /// Reason string of a down classification
    pub fn down_reason(&self) -> Option<&'static str> {
        self.failure.as_ref().and_then(Error::down_reason)
    }
}

/// Remaining validity of a peer certificate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateExpiry {
    pub days_left: i64,
    pub expires_at: DateTime<Utc>,
}

impl CertificateExpiry {
    pub fn expiry_date(&self) -> String {
        self.expires_at.format("%Y-%m-%d").to_string()
    }

    /// Line included in down alerts for HTTPS sites
    pub fn summary(&self) -> String {
        format!("SSL: expires {} ({} days left)", self.expiry_date(), self.days_left)
    }
}

/// Result of a TLS inspection: `Err(Error::TlsFault)` means unavailable,
/// never a certificate problem
pub type CertificateStatus = Result<CertificateExpiry, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_failure_keeps_measured_duration() {
        let result = ProbeResult::failure(
            7,
            "https://ok.example".into(),
            Error::ProtocolFault { status_code: 500, elapsed: Duration::from_millis(250) },
        );
        assert_eq!(result.status, ProbeStatus::Down);
        assert_eq!(result.response_time, Some(Duration::from_millis(250)));
        assert_eq!(result.down_reason(), Some("unexpected status code"));
    }

    #[test]
    fn test_network_fault_has_no_duration() {
        let result = ProbeResult::failure(
            7,
            "https://example.invalid".into(),
            Error::NetworkFault("dns error".into()),
        );
        assert_eq!(result.response_time, None);
        assert_eq!(result.down_reason(), Some("not responding"));
    }

    #[test]
    fn test_status_column_mapping() {
        assert_eq!(ProbeStatus::from_i64(ProbeStatus::Up.as_i64()), ProbeStatus::Up);
        assert_eq!(ProbeStatus::from_i64(0), ProbeStatus::Down);
    }

    #[test]
    fn test_certificate_summary() {
        let expiry = CertificateExpiry {
            days_left: 5,
            expires_at: Utc.with_ymd_and_hms(2025, 1, 20, 12, 0, 0).unwrap(),
        };
        assert_eq!(expiry.summary(), "SSL: expires 2025-01-20 (5 days left)");
    }
}

use std::sync::Arc;

use tracing::debug;

use super::checker::{Checker, HttpChecker};
use super::tls::{CertificateInspector, TlsInspector, tls_endpoint};
use super::types::{CertificateExpiry, CertificateStatus, ProbeResult};
use crate::Result;
use crate::config::MonitorConfig;
use crate::database::Site;

/// Everything learned from probing one site once
#[derive(Debug)]
pub struct SiteReport {
    pub result: ProbeResult,
    /// `None` for sites that are not served over HTTPS
    pub certificate: Option<CertificateStatus>,
}

impl SiteReport {
    /// Certificate details when the inspection succeeded
    pub fn certificate_expiry(&self) -> Option<&CertificateExpiry> {
        self.certificate.as_ref().and_then(|status| status.as_ref().ok())
    }
}

/// Monitoring executor - runs the probe sequence for a single site
pub struct MonitoringExecutor {
    checker: Arc<dyn Checker>,
    inspector: Arc<dyn CertificateInspector>,
}

impl MonitoringExecutor {
    /// Create an executor with the network-backed checker and inspector
    pub fn new(config: &MonitorConfig) -> Result<Self> {
        Ok(Self::with_checkers(
            Arc::new(HttpChecker::new(config.probe_timeout(), &config.user_agent)?),
            Arc::new(TlsInspector::new(config.probe_timeout())?),
        ))
    }

    pub fn with_checkers(
        checker: Arc<dyn Checker>,
        inspector: Arc<dyn CertificateInspector>,
    ) -> Self {
        Self { checker, inspector }
    }

    /// One TLS inspection (HTTPS only), then one HTTP check.
    ///
    /// The inspection never influences the up/down classification.
    pub async fn execute_check(&self, site: &Site) -> SiteReport {
        let certificate = match tls_endpoint(&site.url) {
            Some((host, port)) => {
                let status = self.inspector.inspect(&host, port).await;
                if let Err(e) = &status {
                    debug!(site_id = site.id, "SSL inspection unavailable for {}: {}", site.url, e);
                }
                Some(status)
            }
            None => None,
        };

        let result = match self.checker.check(site).await {
            Ok(elapsed) => ProbeResult::success(site.id, site.url.clone(), elapsed),
            Err(e) => ProbeResult::failure(site.id, site.url.clone(), e),
        };

        SiteReport { result, certificate }
    }
}

use std::time::{Duration, Instant};

use crate::database::Site;
use crate::{Error, Result};

/// Reachability and content check for one site
#[async_trait::async_trait]
pub trait Checker: Send + Sync {
    /// Perform the check and return the elapsed time of a healthy response.
    ///
    /// Failures are classified in strict priority order: network fault,
    /// then status code, then expected text.
    async fn check(&self, site: &Site) -> Result<Duration>;
}

/// HTTP/HTTPS checker
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Checker for HttpChecker {
    async fn check(&self, site: &Site) -> Result<Duration> {
        let start = Instant::now();

        let response = self
            .client
            .get(&site.url)
            .send()
            .await
            .map_err(|e| Error::NetworkFault(e.to_string()))?;

        let status_code = response.status().as_u16();
        // The body is part of "full response" even when the status is wrong
        let body = response.text().await.map_err(|e| Error::NetworkFault(e.to_string()))?;
        let elapsed = start.elapsed();

        if status_code != 200 {
            return Err(Error::ProtocolFault { status_code, elapsed });
        }

        if let Some(expected) = site.content_check() {
            if !body.contains(expected) {
                return Err(Error::ContentMismatch { expected: expected.to_string(), elapsed });
            }
        }

        Ok(elapsed)
    }
}

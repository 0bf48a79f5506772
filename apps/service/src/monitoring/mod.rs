/// Monitoring engine module - probes registered sites
///
/// This module is responsible for:
/// - Inspecting TLS certificates of HTTPS sites
/// - Executing HTTP checks and classifying the outcome
/// - Driving the fleet-wide cycle and raising alerts
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod tls;
pub mod types;

pub use checker::{Checker, HttpChecker};
pub use executor::{MonitoringExecutor, SiteReport};
pub use scheduler::{CycleSummary, MonitoringScheduler};
pub use tls::{CertificateInspector, TlsInspector};
pub use types::{CertificateExpiry, ProbeResult, ProbeStatus};

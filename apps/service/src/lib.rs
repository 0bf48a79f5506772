//! Site availability monitoring engine.
//!
//! Probes registered sites on a shared cadence, records one result per probe,
//! inspects TLS certificate lifetime and raises notifications when a site is
//! down or its certificate is about to expire.

pub mod alert;
pub mod config;
pub mod database;
pub mod error;
pub mod monitoring;
pub mod pool;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Config;
pub use error::{Error, Result};

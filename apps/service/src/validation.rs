use url::Url;

use crate::database::NewSite;
use crate::{Error, Result};

pub const DEFAULT_CHECK_INTERVAL: u64 = 60;
pub const MIN_CHECK_INTERVAL: u64 = 10;
pub const MAX_CHECK_INTERVAL: u64 = 86_400;

/// Validate HTTP/HTTPS URL endpoint, returning it trimmed
pub fn validate_http_endpoint(target: &str) -> Result<String> {
    let target = target.trim();
    if target.is_empty() {
        return Err(Error::Validation("URL cannot be empty".into()));
    }

    let url = Url::parse(target).map_err(|e| {
        if target.contains("://") {
            Error::Validation(format!("Invalid URL: {e}"))
        } else {
            Error::Validation("URL must include scheme (http:// or https://)".into())
        }
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::Validation(format!(
                "Invalid scheme '{other}'. Must be http or https"
            )));
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(Error::Validation("URL must have a valid host".into()));
    }

    Ok(target.to_string())
}

/// Clamp into the accepted range; missing means the default
pub fn normalize_interval(interval: Option<u64>) -> u64 {
    interval
        .unwrap_or(DEFAULT_CHECK_INTERVAL)
        .clamp(MIN_CHECK_INTERVAL, MAX_CHECK_INTERVAL)
}

/// Build a registration from raw input.
///
/// Blank expected text is dropped so it is stored as NULL.
pub fn validate_new_site(
    url: &str,
    interval: Option<u64>,
    expected_text: Option<&str>,
) -> Result<NewSite> {
    Ok(NewSite {
        url: validate_http_endpoint(url)?,
        check_interval: normalize_interval(interval),
        expected_text: expected_text
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string),
    })
}

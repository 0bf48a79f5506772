//! Human-readable notifications, rendered as Telegram-flavoured HTML.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::Error;
use crate::database::Site;
use crate::monitoring::types::{CertificateExpiry, ProbeResult};

const PLACEHOLDER: &str = "—";

/// A condition worth telling a human about
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    SiteDown {
        url: String,
        detected_at: DateTime<Utc>,
        response_time: Option<Duration>,
        expected_text: Option<String>,
        check_interval: u64,
        ssl_summary: Option<String>,
        reason: String,
    },
    CertificateExpiring {
        url: String,
        days_left: i64,
        expiry_date: String,
    },
}

impl Alert {
    /// Down alert for a failed probe, `None` if the probe succeeded
    pub fn site_down(
        site: &Site,
        result: &ProbeResult,
        certificate: Option<&CertificateExpiry>,
    ) -> Option<Self> {
        let failure = result.failure.as_ref()?;
        Some(Alert::SiteDown {
            url: site.url.clone(),
            detected_at: result.timestamp,
            response_time: result.response_time,
            expected_text: site.content_check().map(str::to_string),
            check_interval: site.check_interval,
            ssl_summary: certificate.map(CertificateExpiry::summary),
            reason: reason_line(failure),
        })
    }

    pub fn certificate_expiring(site: &Site, certificate: &CertificateExpiry) -> Self {
        Alert::CertificateExpiring {
            url: site.url.clone(),
            days_left: certificate.days_left,
            expiry_date: certificate.expiry_date(),
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Alert::SiteDown { url, .. } | Alert::CertificateExpiring { url, .. } => url,
        }
    }

    /// Render the message body; `panel_url` is linked from down alerts
    pub fn render(&self, panel_url: &str) -> String {
        match self {
            Alert::SiteDown {
                url,
                detected_at,
                response_time,
                expected_text,
                check_interval,
                ssl_summary,
                reason,
            } => {
                let response = response_time
                    .map(|elapsed| format!("{:.3} s", elapsed.as_secs_f64()))
                    .unwrap_or_else(|| PLACEHOLDER.to_string());
                let expected = expected_text
                    .as_deref()
                    .map(escape_html)
                    .unwrap_or_else(|| PLACEHOLDER.to_string());
                let ssl_line = ssl_summary
                    .as_deref()
                    .map(|summary| format!("🔐 {}\n", escape_html(summary)))
                    .unwrap_or_default();

                format!(
                    "🔴 <b>SITE IS DOWN</b>\n\n\
                     🌐 <b>Site:</b> <code>{url}</code>\n\
                     🕒 <b>Time:</b> {time} UTC\n\
                     ⏱️ <b>Response:</b> {response}\n\
                     📝 <b>Expected text:</b> <code>{expected}</code>\n\
                     🔄 <b>Interval:</b> {check_interval} s\n\
                     {ssl_line}\n\
                     📋 <b>Reason:</b>\n{reason}\n\n\
                     🔧 <b>What to do?</b>\n\
                     ➡️ Check the server\n\
                     ➡️ Make sure the site is accessible\n\n\
                     📊 <b>Monitoring:</b>\n\
                     <a href=\"{panel}\">Open panel</a>\n",
                    url = escape_html(url),
                    time = detected_at.format("%Y-%m-%d %H:%M:%S"),
                    panel = escape_html(panel_url),
                )
            }
            Alert::CertificateExpiring { url, days_left, expiry_date } => format!(
                "⚠️ <b>SSL will expire soon!</b>\n\n\
                 🌐 <code>{url}</code>\n\
                 📅 Left: {days_left} days (expires {expiry_date})",
                url = escape_html(url),
            ),
        }
    }
}

/// Reason section of a down alert, led by the classification string
fn reason_line(failure: &Error) -> String {
    match failure {
        Error::NetworkFault(detail) => {
            format!("❌ not responding (timeout or connection error)\n<i>{}</i>", escape_html(detail))
        }
        Error::ProtocolFault { status_code, .. } => {
            format!("⚠️ unexpected status code: HTTP {status_code}")
        }
        Error::ContentMismatch { expected, .. } => {
            format!("🔍 expected text not found: <code>{}</code>", escape_html(expected))
        }
        other => format!("❓ {}", escape_html(&other.to_string())),
    }
}

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

use std::{env, fmt, fs, path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound for every outbound network wait.
const MAX_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read config file: {0}")]
    ReadFailed(#[source] std::io::Error),
    #[error("failed to write config file: {0}")]
    WriteFailed(#[source] std::io::Error),
    #[error("failed to parse config file: {0}")]
    ParseFailed(String),
    #[error("no config path available (set XDG_CONFIG_HOME or HOME)")]
    ConfigPathUnavailable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub monitor: MonitorConfig,
    pub notifications: NotificationConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Pacing and probing parameters shared by the whole fleet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub probe_timeout_seconds: u64,
    pub site_pause_seconds: u64,
    pub cycle_pause_seconds: u64,
    pub ssl_warning_days: i64,
    pub max_concurrent_probes: usize,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub api_base: String,
    pub panel_url: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "sites.db".into() }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            probe_timeout_seconds: 10,
            site_pause_seconds: 1,
            cycle_pause_seconds: 10,
            ssl_warning_days: 7,
            max_concurrent_probes: 1,
            user_agent: "UptimeMonitor/1.0".into(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            telegram_token: None,
            telegram_chat_id: None,
            api_base: "https://api.telegram.org".into(),
            panel_url: "http://localhost:5000".into(),
            timeout_seconds: 10,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: "0.0.0.0".into(), port: 5000 }
    }
}

impl MonitorConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_seconds)
    }

    pub fn site_pause(&self) -> Duration {
        Duration::from_secs(self.site_pause_seconds)
    }

    pub fn cycle_pause(&self) -> Duration {
        Duration::from_secs(self.cycle_pause_seconds)
    }
}

impl NotificationConfig {
    /// Token and destination, only when both are present and non-blank
    pub fn telegram_credentials(&self) -> Option<(&str, &str)> {
        let token = self.telegram_token.as_deref().map(str::trim).filter(|t| !t.is_empty())?;
        let chat_id = self.telegram_chat_id.as_deref().map(str::trim).filter(|c| !c.is_empty())?;
        Some((token, chat_id))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Used to ensure we are actually reading a toml file
fn normalize_toml_path(path: &path::Path) -> path::PathBuf {
    let mut path = path.to_path_buf();
    if path.extension().map(|ext| ext != "toml").unwrap_or(true) {
        path.set_extension("toml");
    }
    path
}

/// Get default config path ($XDG_CONFIG_HOME/sitewatch/config.toml or
/// $HOME/.config/...)
fn default_config_path() -> Result<path::PathBuf, Error> {
    let path = if let Ok(config_home) = env::var("XDG_CONFIG_HOME") {
        path::PathBuf::from(config_home)
    } else if let Some(home_dir) = env::home_dir() {
        home_dir.join(".config")
    } else {
        return Err(Error::ConfigPathUnavailable);
    };

    Ok(path.join("sitewatch/config.toml"))
}

fn mask(secret: &Option<String>) -> &'static str {
    match secret {
        Some(value) if !value.trim().is_empty() => "<set>",
        _ => "<unset>",
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str, value: &dyn fmt::Display| {
                writeln!(f, "  {:indent$}{}: {}", "", label, value, indent = level * 2)
            }
        };
        let write_title_indented = |level: usize| {
            move |f: &mut fmt::Formatter<'_>, label: &str| {
                writeln!(f, "{:indent$}{}", "", label, indent = level * 2)
            }
        };

        let write_title_1 = write_title_indented(1);
        let write_1 = write_indented(1);

        writeln!(f, "Current Internal Configuration State:")?;
        write_title_1(f, "Database")?;
        write_1(f, "Path", &self.database.path)?;
        write_title_1(f, "Monitor")?;
        write_1(f, "Probe Timeout (s)", &self.monitor.probe_timeout_seconds)?;
        write_1(f, "Site Pause (s)", &self.monitor.site_pause_seconds)?;
        write_1(f, "Cycle Pause (s)", &self.monitor.cycle_pause_seconds)?;
        write_1(f, "SSL Warning (days)", &self.monitor.ssl_warning_days)?;
        write_1(f, "Concurrent Probes", &self.monitor.max_concurrent_probes)?;
        write_1(f, "User Agent", &self.monitor.user_agent)?;
        write_title_1(f, "Notifications")?;
        write_1(f, "Telegram Token", &mask(&self.notifications.telegram_token))?;
        write_1(f, "Telegram Chat", &mask(&self.notifications.telegram_chat_id))?;
        write_1(f, "API Base", &self.notifications.api_base)?;
        write_1(f, "Panel URL", &self.notifications.panel_url)?;
        write_title_1(f, "Server")?;
        write_1(f, "Bind Address", &self.server.bind)?;
        write_1(f, "Port", &self.server.port)?;

        Ok(())
    }
}

impl Config {
    /// Generate Config structure from file
    ///
    /// Creates a default config in ~/.config/sitewatch/config.toml
    ///  or the specified path, with the name config.toml if one does not exist
    ///
    /// ```no_run
    /// use sitewatch_service::Config;
    ///
    /// let cfg = Config::from_config(None::<&std::path::Path>)?;
    /// println!("{}", cfg);
    /// # Ok::<(), sitewatch_service::config::Error>(())
    /// ```
    pub fn from_config(optional_path: Option<impl AsRef<path::Path>>) -> Result<Self, Error> {
        let config_path: path::PathBuf = if let Some(path) = optional_path {
            normalize_toml_path(path.as_ref())
        } else {
            default_config_path()?
        };

        let config = if config_path.exists() {
            let raw_string = fs::read_to_string(&config_path).map_err(Error::ReadFailed)?;
            toml::from_str(raw_string.as_str()).map_err(|err| Error::ParseFailed(err.to_string()))?
        } else {
            let config = Self::default();
            config.write_config(&config_path)?;
            config
        };

        Ok(config.normalized())
    }

    /// Serialize and write a config to a file
    pub fn write_config(&self, path: &std::path::Path) -> Result<(), Error> {
        let config_str: String =
            toml::to_string_pretty(self).map_err(|err| Error::ParseFailed(err.to_string()))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(Error::WriteFailed)?;
        }

        std::fs::write(path, config_str).map_err(Error::WriteFailed)
    }

    /// Apply overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(token) = lookup("TELEGRAM_TOKEN") {
            self.notifications.telegram_token = Some(token);
        }
        if let Some(chat_id) = lookup("TELEGRAM_CHAT_ID") {
            self.notifications.telegram_chat_id = Some(chat_id);
        }
        if let Some(path) = lookup("SITEWATCH_DATABASE") {
            self.database.path = path;
        }
        if let Some(bind) = lookup("SITEWATCH_BIND") {
            self.server.bind = bind;
        }
        if let Some(port) = lookup("SITEWATCH_PORT").and_then(|port| port.parse().ok()) {
            self.server.port = port;
        }
        self.normalized()
    }

    /// Clamp values into the ranges the engine relies on
    pub fn normalized(mut self) -> Self {
        self.monitor.probe_timeout_seconds =
            self.monitor.probe_timeout_seconds.clamp(1, MAX_TIMEOUT_SECONDS);
        self.notifications.timeout_seconds =
            self.notifications.timeout_seconds.clamp(1, MAX_TIMEOUT_SECONDS);
        self.monitor.max_concurrent_probes = self.monitor.max_concurrent_probes.max(1);
        self
    }

    /// Longest a single site's turn can take once it has started.
    ///
    /// TLS connect and handshake, the HTTP request, a certificate and a
    /// down alert, then the write of the result.
    pub fn shutdown_grace(&self) -> Duration {
        self.monitor.probe_timeout() * 3
            + self.notifications.timeout() * 2
            + Duration::from_millis(crate::pool::BUSY_TIMEOUT_MS)
    }
}

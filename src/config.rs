//! Centralized configuration management for studyadmin

use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Result, Context};
use reqwest::Url;

/// Default REST API base URL
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the REST API (without the `/api/v1` prefix)
    pub api_url: String,
    /// URL of the push event stream
    pub push_url: String,
    /// Log file used by the dashboard and mirrored by the CLI
    pub log_file: PathBuf,
    /// HTTP client configuration
    pub http: HttpConfig,
    /// Dashboard timing configuration
    pub ui: UiConfig,
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout in seconds. `None` keeps the HTTP library default.
    pub timeout_seconds: Option<u64>,
    /// User agent string
    pub user_agent: String,
}

/// Dashboard timing configuration
#[derive(Debug, Clone)]
pub struct UiConfig {
    /// How long a notification stays on screen
    pub toast_seconds: u64,
    /// Delay before reconnecting a dropped push stream
    pub reconnect_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: None,
            user_agent: "studyadmin/0.1.0".to_string(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            toast_seconds: 5,
            reconnect_seconds: 3,
        }
    }
}

impl Config {
    /// Load configuration from environment variables and defaults
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("STUDYADMIN_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let push_url = lookup("STUDYADMIN_PUSH_URL")
            .unwrap_or_else(|| format!("{}/api/v1/events", api_url));

        let log_file = lookup("STUDYADMIN_LOG_FILE")
            .unwrap_or_else(|| "studyadmin.log".to_string())
            .into();

        let http = HttpConfig {
            timeout_seconds: parse_var(&lookup, "STUDYADMIN_HTTP_TIMEOUT_SECONDS")?,
            user_agent: lookup("STUDYADMIN_USER_AGENT")
                .unwrap_or_else(|| "studyadmin/0.1.0".to_string()),
        };

        let ui = UiConfig {
            toast_seconds: parse_var(&lookup, "STUDYADMIN_TOAST_SECONDS")?.unwrap_or(5),
            reconnect_seconds: parse_var(&lookup, "STUDYADMIN_RECONNECT_SECONDS")?.unwrap_or(3),
        };

        Ok(Config {
            api_url,
            push_url,
            log_file,
            http,
            ui,
        })
    }

    /// Get HTTP timeout as Duration, if one is configured
    pub fn http_timeout(&self) -> Option<Duration> {
        self.http.timeout_seconds.map(Duration::from_secs)
    }

    /// Get notification lifetime as Duration
    pub fn toast_timeout(&self) -> Duration {
        Duration::from_secs(self.ui.toast_seconds)
    }

    /// Get push reconnect delay as Duration
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.ui.reconnect_seconds)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        check_http_url("STUDYADMIN_API_URL", &self.api_url)?;
        check_http_url("STUDYADMIN_PUSH_URL", &self.push_url)?;

        if self.http.timeout_seconds == Some(0) {
            return Err(anyhow::anyhow!("STUDYADMIN_HTTP_TIMEOUT_SECONDS must be greater than zero"));
        }

        Ok(())
    }
}

fn check_http_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .with_context(|| format!("{} is not a valid URL: '{}'", name, value))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(anyhow::anyhow!(
            "{} must use http or https, got '{}'",
            name,
            other
        )),
    }
}

/// Helper function to parse a variable as a specific type
fn parse_var<T, F>(lookup: &F, var_name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display + Send + Sync + std::error::Error + 'static,
{
    match lookup(var_name) {
        Some(val) => val.parse().map(Some).with_context(|| {
            format!("Failed to parse environment variable {} = '{}'", var_name, val)
        }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api_url, "http://localhost:8000");
        assert_eq!(config.push_url, "http://localhost:8000/api/v1/events");
        assert_eq!(config.http.timeout_seconds, None);
        assert!(config.http_timeout().is_none());
        assert_eq!(config.ui.toast_seconds, 5);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_overrides() {
        let config = config_from(&[
            ("STUDYADMIN_API_URL", "https://admin.example.org/"),
            ("STUDYADMIN_HTTP_TIMEOUT_SECONDS", "15"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://admin.example.org");
        assert_eq!(config.push_url, "https://admin.example.org/api/v1/events");
        assert_eq!(config.http_timeout(), Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(config_from(&[("STUDYADMIN_TOAST_SECONDS", "soon")]).is_err());

        let config = config_from(&[("STUDYADMIN_API_URL", "ftp://example.org")]).unwrap();
        assert!(config.validate().is_err());
    }
}

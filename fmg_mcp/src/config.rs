//! Server settings.
//!
//! Everything is read from `FORTIMANAGER_*` environment variables so the
//! server can be dropped into an MCP client configuration without a config
//! file; the CLI flags in `main` override individual fields. Parsing is
//! done over an explicit key/value iterator so tests never touch the
//! process environment.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use fmg_api::{FmgClient, FmgError};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    /// FortiManager hostname or IP. Empty means unconfigured.
    pub host: String,
    pub username: String,
    pub password: String,
    pub api_token: String,
    /// TLS certificate verification; lab appliances commonly run
    /// self-signed certificates, so this defaults off like the upstream
    /// deployment guides assume.
    pub verify_ssl: bool,
    /// Per-request HTTP timeout in seconds.
    pub timeout: u64,
    /// Login retry attempts.
    pub max_retries: u32,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: String::new(),
            username: String::new(),
            password: String::new(),
            api_token: String::new(),
            verify_ssl: false,
            timeout: 30,
            max_retries: 3,
            log_level: "info".to_string(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Settings {
    /// Build settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Build settings from an explicit variable iterator.
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Settings::default();
        for (key, value) in vars {
            match key.as_str() {
                "FORTIMANAGER_HOST" => settings.host = value,
                "FORTIMANAGER_USERNAME" => settings.username = value,
                "FORTIMANAGER_PASSWORD" => settings.password = value,
                "FORTIMANAGER_API_TOKEN" => settings.api_token = value,
                "FORTIMANAGER_VERIFY_SSL" => settings.verify_ssl = parse_bool(&value),
                "FORTIMANAGER_TIMEOUT" => {
                    if let Ok(timeout) = value.trim().parse() {
                        settings.timeout = timeout;
                    }
                }
                "FORTIMANAGER_MAX_RETRIES" => {
                    if let Ok(retries) = value.trim().parse() {
                        settings.max_retries = retries;
                    }
                }
                "LOG_LEVEL" => settings.log_level = value,
                _ => {}
            }
        }
        settings
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }

    /// Build the API client for these settings. Token auth wins when both
    /// a token and credentials are present.
    pub fn build_client(&self) -> Result<FmgClient, FmgError> {
        let mut builder = FmgClient::builder(&self.host)
            .danger_accept_invalid_certs(!self.verify_ssl)
            .request_timeout(Duration::from_secs(self.timeout))
            .login_retries(self.max_retries);

        if !self.api_token.is_empty() {
            builder = builder.token(&self.api_token);
        } else if !self.username.is_empty() {
            builder = builder.credentials(&self.username, &self.password);
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(entries: &[(&str, &str)]) -> Vec<(String, String)> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_match_unconfigured_environment() {
        let settings = Settings::from_vars(Vec::new());
        assert!(!settings.is_configured());
        assert!(!settings.verify_ssl);
        assert_eq!(settings.timeout, 30);
        assert_eq!(settings.max_retries, 3);
        assert_eq!(settings.log_level, "info");
    }

    #[test]
    fn reads_connection_variables() {
        let settings = Settings::from_vars(vars(&[
            ("FORTIMANAGER_HOST", "fmg.example.com"),
            ("FORTIMANAGER_USERNAME", "api-admin"),
            ("FORTIMANAGER_PASSWORD", "secret"),
            ("FORTIMANAGER_VERIFY_SSL", "true"),
            ("FORTIMANAGER_TIMEOUT", "60"),
            ("FORTIMANAGER_MAX_RETRIES", "5"),
            ("LOG_LEVEL", "debug"),
            ("UNRELATED", "ignored"),
        ]));

        assert!(settings.is_configured());
        assert_eq!(settings.host, "fmg.example.com");
        assert_eq!(settings.username, "api-admin");
        assert!(settings.verify_ssl);
        assert_eq!(settings.timeout, 60);
        assert_eq!(settings.max_retries, 5);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn malformed_numbers_keep_defaults() {
        let settings = Settings::from_vars(vars(&[("FORTIMANAGER_TIMEOUT", "soon")]));
        assert_eq!(settings.timeout, 30);
    }

    #[test]
    fn client_requires_some_auth() {
        let settings = Settings::from_vars(vars(&[("FORTIMANAGER_HOST", "fmg.example.com")]));
        assert!(settings.build_client().is_err());

        let settings = Settings::from_vars(vars(&[
            ("FORTIMANAGER_HOST", "fmg.example.com"),
            ("FORTIMANAGER_API_TOKEN", "token"),
        ]));
        assert!(settings.build_client().is_ok());
    }

    #[test]
    fn token_auth_wins_over_credentials() {
        let settings = Settings::from_vars(vars(&[
            ("FORTIMANAGER_HOST", "fmg.example.com"),
            ("FORTIMANAGER_API_TOKEN", "token"),
            ("FORTIMANAGER_USERNAME", "admin"),
            ("FORTIMANAGER_PASSWORD", "pw"),
        ]));
        let client = settings.build_client().expect("builds");
        let debug = format!("{client:?}");
        assert!(debug.contains("Auth::Token"), "debug: {debug}");
    }
}

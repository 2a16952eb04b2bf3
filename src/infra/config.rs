use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const API_URL_ENV: &str = "LOOKUPDESK_API_URL";
pub const SOCKET_URL_ENV: &str = "LOOKUPDESK_SOCKET_URL";
pub const STATE_DIR_ENV: &str = "LOOKUPDESK_STATE_DIR";
pub const BOT_ENV: &str = "LOOKUPDESK_BOT";
pub const TIMEOUT_ENV: &str = "LOOKUPDESK_TIMEOUT_SECS";

const DEFAULT_BOT: &str = "@OSngrok_bot";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub api_url: Option<Url>,
    pub socket_url: Option<Url>,
    pub state_dir: PathBuf,
    pub bot: String,
    pub timeout: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid URL: {reason}")]
    InvalidUrl { name: &'static str, reason: String },

    #[error("LOOKUPDESK_TIMEOUT_SECS must be a positive number of seconds, got {0:?}")]
    InvalidTimeout(String),

    #[error("LOOKUPDESK_API_URL is not set")]
    MissingApiUrl,

    #[error(transparent)]
    StateDir(#[from] ResolveStateDirError),
}

#[derive(Debug, Error)]
pub enum ResolveStateDirError {
    #[error("home directory not found")]
    HomeDirNotFound,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_url = var(API_URL_ENV)
            .map(|raw| parse_url(API_URL_ENV, &raw))
            .transpose()?;
        let socket_url = match var(SOCKET_URL_ENV) {
            Some(raw) => Some(parse_url(SOCKET_URL_ENV, &raw)?),
            None => api_url.clone(),
        };
        let state_dir = match var(STATE_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => resolve_state_dir()?,
        };
        let bot = var(BOT_ENV).unwrap_or_else(|| DEFAULT_BOT.to_string());
        let timeout = match var(TIMEOUT_ENV) {
            Some(raw) => parse_timeout(&raw)?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            api_url,
            socket_url,
            state_dir,
            bot,
            timeout,
        })
    }

    pub fn require_api_url(&self) -> Result<&Url, ConfigError> {
        self.api_url.as_ref().ok_or(ConfigError::MissingApiUrl)
    }

    /// API base without a trailing slash, as used for the image download endpoint.
    pub fn download_base(&self) -> Option<String> {
        self.api_url
            .as_ref()
            .map(|url| url.as_str().trim_end_matches('/').to_string())
    }
}

pub fn resolve_state_dir() -> Result<PathBuf, ResolveStateDirError> {
    let Some(home) = dirs::home_dir() else {
        return Err(ResolveStateDirError::HomeDirNotFound);
    };
    Ok(home.join(".lookupdesk"))
}

fn parse_url(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|error| ConfigError::InvalidUrl {
        name,
        reason: error.to_string(),
    })
}

fn parse_timeout(raw: &str) -> Result<Duration, ConfigError> {
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidTimeout(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn socket_url_defaults_to_api_url() {
        let config = config_from(&[
            (API_URL_ENV, "https://api.example/"),
            (STATE_DIR_ENV, "/tmp/lookupdesk"),
        ])
        .expect("config");
        assert_eq!(config.socket_url, config.api_url);
        assert_eq!(config.bot, DEFAULT_BOT);
        assert_eq!(config.timeout, Duration::from_secs(15));
        assert_eq!(config.state_dir, PathBuf::from("/tmp/lookupdesk"));
        assert_eq!(config.download_base().as_deref(), Some("https://api.example"));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = config_from(&[
            (API_URL_ENV, "https://api.example"),
            (SOCKET_URL_ENV, "https://push.example"),
            (STATE_DIR_ENV, "/tmp/x"),
            (BOT_ENV, "@other_bot"),
            (TIMEOUT_ENV, "3"),
        ])
        .expect("config");
        assert_eq!(
            config.socket_url.as_ref().map(Url::as_str),
            Some("https://push.example/")
        );
        assert_eq!(config.bot, "@other_bot");
        assert_eq!(config.timeout, Duration::from_secs(3));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            config_from(&[(API_URL_ENV, "not a url"), (STATE_DIR_ENV, "/tmp/x")]),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            config_from(&[(TIMEOUT_ENV, "0"), (STATE_DIR_ENV, "/tmp/x")]),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn missing_api_url_is_reported_on_demand() {
        let config = config_from(&[(STATE_DIR_ENV, "/tmp/x"), (API_URL_ENV, "  ")])
            .expect("config");
        assert!(config.api_url.is_none());
        assert!(matches!(
            config.require_api_url(),
            Err(ConfigError::MissingApiUrl)
        ));
    }
}

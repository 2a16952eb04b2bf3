use crate::domain::{CompanyDoc, RawMessage};
use crate::infra::{Config, ConfigError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("lookupdesk/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },

    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("server error: {0}")]
    Remote(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct BotApiResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub results: Vec<RawMessage>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CompanyDocsResponse {
    #[serde(default)]
    pub data: Vec<CompanyDoc>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LoginOutcome {
    pub token: String,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Debug, Deserialize)]
struct LoginData {
    token: String,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    val: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat: &'a str,
    message: &'a str,
}

#[derive(Debug, Serialize)]
struct SendButtonRequest<'a> {
    chat: &'a str,
    button_data: &'a str,
}

#[derive(Debug, Serialize)]
struct CompanySearchRequest<'a> {
    search: &'a str,
}

/// Blocking client for the lookup backend.
pub struct ApiClient {
    agent: ureq::Agent,
    base: String,
    bot: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base: &str, bot: &str, timeout: Duration, token: Option<String>) -> Self {
        Self {
            agent: make_agent(timeout),
            base: base.trim_end_matches('/').to_string(),
            bot: bot.to_string(),
            token,
        }
    }

    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self, ConfigError> {
        let base = config.require_api_url()?;
        Ok(Self::new(base.as_str(), &config.bot, config.timeout, token))
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    pub fn fetch_results(&self) -> Result<Vec<RawMessage>, ApiError> {
        let endpoint = self.endpoint("results");
        debug!(%endpoint, "fetching results");
        let mut request = self.agent.get(&endpoint).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        let mut response = request.call().map_err(|error| ApiError::Request {
            endpoint: endpoint.clone(),
            reason: error.to_string(),
        })?;
        let parsed: BotApiResponse = read_json(&endpoint, response.body_mut())?;
        results_or_error(parsed)
    }

    pub fn fetch_companies(&self, query: &str) -> Result<Vec<CompanyDoc>, ApiError> {
        let endpoint = self.endpoint("company/search");
        let parsed: CompanyDocsResponse =
            self.post_json(&endpoint, &CompanySearchRequest { search: query })?;
        match parsed.error.filter(|error| !error.trim().is_empty()) {
            Some(error) => Err(ApiError::Remote(error)),
            None => Ok(parsed.data),
        }
    }

    pub fn send_message(&self, message: &str) -> Result<(), ApiError> {
        let endpoint = self.endpoint("send");
        self.post_only(
            &endpoint,
            &SendMessageRequest {
                chat: &self.bot,
                message,
            },
        )
    }

    pub fn send_button(&self, button_data: &str) -> Result<(), ApiError> {
        let endpoint = self.endpoint("send-button");
        self.post_only(
            &endpoint,
            &SendButtonRequest {
                chat: &self.bot,
                button_data,
            },
        )
    }

    pub fn login(&self, val: &str, password: &str) -> Result<LoginOutcome, ApiError> {
        let endpoint = self.endpoint("api/v1/auth/login");
        let parsed: LoginResponse = self.post_json(&endpoint, &LoginRequest { val, password })?;
        Ok(LoginOutcome {
            token: parsed.data.token,
            username: parsed.data.user.and_then(|user| user.name),
        })
    }

    fn post(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<ureq::http::Response<ureq::Body>, ApiError> {
        debug!(%endpoint, "posting");
        let mut request = self.agent.post(endpoint).header("User-Agent", USER_AGENT);
        if let Some(token) = &self.token {
            request = request.header("Authorization", &format!("Bearer {token}"));
        }
        request.send_json(body).map_err(|error| ApiError::Request {
            endpoint: endpoint.to_string(),
            reason: error.to_string(),
        })
    }

    fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &impl Serialize,
    ) -> Result<T, ApiError> {
        let mut response = self.post(endpoint, body)?;
        read_json(endpoint, response.body_mut())
    }

    fn post_only(&self, endpoint: &str, body: &impl Serialize) -> Result<(), ApiError> {
        self.post(endpoint, body).map(|_| ())
    }
}

fn read_json<T: DeserializeOwned>(endpoint: &str, body: &mut ureq::Body) -> Result<T, ApiError> {
    body.read_json::<T>().map_err(|error| ApiError::Decode {
        endpoint: endpoint.to_string(),
        reason: error.to_string(),
    })
}

/// A non-blank `error` wins; a bare `status: "error"` still fails the call.
fn results_or_error(parsed: BotApiResponse) -> Result<Vec<RawMessage>, ApiError> {
    debug!(
        status = parsed.status.as_deref().unwrap_or("-"),
        count = parsed.results.len(),
        "results response"
    );
    if let Some(error) = parsed.error.filter(|error| !error.trim().is_empty()) {
        return Err(ApiError::Remote(error));
    }
    if parsed
        .status
        .as_deref()
        .is_some_and(|status| status.trim().eq_ignore_ascii_case("error"))
    {
        return Err(ApiError::Remote("results request failed".to_string()));
    }
    Ok(parsed.results)
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}

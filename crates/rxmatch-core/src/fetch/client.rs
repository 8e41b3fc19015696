//! Blocking HTTP implementation of [`SupplementPages`].

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use super::{
    parse_page, Credentials, FetchError, FetchResult, SupplementPages, SupplementRecord,
    ENV_API_URL,
};

/// HTTP request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Supplement endpoint client.
pub struct HttpSupplementPages {
    client: Client,
    url: String,
    credentials: Credentials,
    active_only: bool,
}

impl HttpSupplementPages {
    pub fn new(url: impl Into<String>, credentials: Credentials) -> FetchResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("rxmatch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            credentials,
            active_only: true,
        })
    }

    /// Endpoint and credentials from the environment.
    pub fn from_env() -> FetchResult<Self> {
        let url = std::env::var(ENV_API_URL)
            .ok()
            .filter(|u| !u.trim().is_empty())
            .ok_or(FetchError::MissingSetting(ENV_API_URL))?;
        Self::new(url, Credentials::from_env()?)
    }

    /// Include inactive catalogue entries.
    pub fn include_inactive(mut self, include: bool) -> Self {
        self.active_only = !include;
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.credentials {
            Credentials::ApiKey(key) if key.starts_with("Basic ") => {
                request.header(AUTHORIZATION, key.as_str())
            }
            Credentials::ApiKey(key) => request.bearer_auth(key),
            Credentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
        }
    }
}

impl SupplementPages for HttpSupplementPages {
    fn fetch_page(&self, limit: usize, offset: usize) -> FetchResult<Vec<SupplementRecord>> {
        debug!(offset, limit, "requesting supplements page");

        let mut query = vec![("limit", limit.to_string()), ("offset", offset.to_string())];
        if self.active_only {
            query.push(("active_only", "true".to_string()));
        }

        let request = self
            .client
            .get(&self.url)
            .header(ACCEPT, "application/json")
            .query(&query);
        let response = self.authorize(request).send()?;

        match response.status() {
            status if status.is_success() => {
                let body: Value = response.json()?;
                parse_page(body)
            }
            StatusCode::UNAUTHORIZED => Err(FetchError::Unauthorized),
            StatusCode::NOT_FOUND => Err(FetchError::NotFound(self.url.clone())),
            status => {
                let message = response
                    .text()
                    .unwrap_or_else(|_| "Unknown error".to_string());
                Err(FetchError::Status {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}

//! HTTP client for the API under test
//!
//! Every call returns the raw status and JSON body so that scenarios can
//! assert on failures as easily as on successes. Only transport errors and
//! non-JSON success bodies are errors at this layer. A non-JSON error page
//! is kept as a JSON string so its status can still be checked.

use std::time::Duration;

use pavlo_contract::endpoint::HttpMethod;
use pavlo_contract::{AuthRequest, Endpoint, NewSearchEntry, ScrapeRequest};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::config::RunnerConfig;
use crate::error::{E2eError, E2eResult};

const SNIPPET_LEN: usize = 300;

/// Status and decoded body of one call
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: HttpMethod,
    pub path: String,
    pub status: u16,
    /// `Value::Null` when the body was empty, a string for non-JSON errors
    pub body: Value,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body, truncated for error messages
    pub fn snippet(&self) -> String {
        truncate(&self.body.to_string())
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

fn truncate(text: &str) -> String {
    if text.chars().count() <= SNIPPET_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_LEN).collect();
    format!("{cut}…")
}

fn to_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

/// Client bound to one base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> E2eResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &RunnerConfig) -> E2eResult<Self> {
        Self::new(config.base_url(), config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request. `body` is serialized as JSON when present.
    pub async fn send<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        token: Option<&str>,
        body: Option<&B>,
    ) -> E2eResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);

        let mut req = self
            .http
            .request(to_method(method), &url)
            .header(ACCEPT, "application/json");
        if let Some(token) = token {
            req = req.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await?;
        let status = resp.status().as_u16();
        let text = resp.text().await?;

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(body) => body,
                Err(_) if status >= 400 => Value::String(text),
                Err(_) => {
                    return Err(E2eError::NonJson {
                        method: method.to_string(),
                        path: path.to_string(),
                        status,
                        snippet: truncate(&text),
                    })
                }
            }
        };
        debug!("{} {} -> {}", method, path, status);

        Ok(ApiResponse {
            method,
            path: path.to_string(),
            status,
            body,
        })
    }

    /// Call an endpoint from the contract table
    pub async fn call<B: Serialize + ?Sized>(
        &self,
        endpoint: Endpoint,
        token: Option<&str>,
        body: Option<&B>,
    ) -> E2eResult<ApiResponse> {
        self.send(endpoint.method(), endpoint.path(), token, body).await
    }

    async fn call_empty(&self, endpoint: Endpoint, token: Option<&str>) -> E2eResult<ApiResponse> {
        self.call::<Value>(endpoint, token, None).await
    }

    pub async fn register(&self, creds: &AuthRequest) -> E2eResult<ApiResponse> {
        self.call(Endpoint::Register, None, Some(creds)).await
    }

    /// Register with an arbitrary (possibly malformed) payload
    pub async fn register_raw(&self, payload: &Value) -> E2eResult<ApiResponse> {
        self.call(Endpoint::Register, None, Some(payload)).await
    }

    pub async fn login(&self, creds: &AuthRequest) -> E2eResult<ApiResponse> {
        self.call(Endpoint::Login, None, Some(creds)).await
    }

    pub async fn logout(&self, token: Option<&str>) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::Logout, token).await
    }

    pub async fn me(&self, token: Option<&str>) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::Me, token).await
    }

    pub async fn add_search(
        &self,
        token: Option<&str>,
        entry: &NewSearchEntry,
    ) -> E2eResult<ApiResponse> {
        self.call(Endpoint::AddSearch, token, Some(entry)).await
    }

    pub async fn history(&self, token: Option<&str>) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::History, token).await
    }

    pub async fn scrape(
        &self,
        token: Option<&str>,
        request: &ScrapeRequest,
    ) -> E2eResult<ApiResponse> {
        self.call(Endpoint::Scrape, token, Some(request)).await
    }

    pub async fn n8n_scrape(&self, request: &ScrapeRequest) -> E2eResult<ApiResponse> {
        self.call(Endpoint::N8nScrape, None, Some(request)).await
    }

    pub async fn location(&self) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::Location, None).await
    }

    pub async fn admin_users(&self, token: Option<&str>) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::AdminUsers, token).await
    }

    pub async fn ping(&self) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::Ping, None).await
    }

    pub async fn health(&self) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::Health, None).await
    }

    pub async fn supported_countries(&self) -> E2eResult<ApiResponse> {
        self.call_empty(Endpoint::SupportedCountries, None).await
    }
}

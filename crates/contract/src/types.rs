//! Wire types for the Pavlo API
//!
//! Field names follow the server's camelCase JSON. Optional fields are
//! the ones some responses omit; everything else is required and
//! deserialization fails when it is missing or has the wrong JSON type.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ContractError, Result};
use crate::profile::ContractProfile;

// ============================================================================
// Users and sessions
// ============================================================================

/// Body of register and login requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthRequest {
    pub email: String,
    pub password: String,
}

/// A user as returned by the auth endpoints. The password never appears.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_count: Option<u64>,
    /// Any other keys the server sent, kept so secrets can be detected
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of register and login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    pub user: User,
}

impl AuthResponse {
    /// The bearer token this response issues.
    ///
    /// Canonical servers send `accessToken`, and `token` must agree with
    /// it when both are present. Lenient accepts either field.
    pub fn bearer(&self, profile: ContractProfile) -> Result<&str> {
        let access = self.access_token.as_deref().filter(|t| !t.is_empty());
        let legacy = self.token.as_deref().filter(|t| !t.is_empty());

        match profile {
            ContractProfile::Canonical => {
                let access = access.ok_or_else(|| {
                    ContractError::field("auth response", "accessToken", "is missing or empty")
                })?;
                if let Some(legacy) = legacy {
                    if legacy != access {
                        return Err(ContractError::field(
                            "auth response",
                            "token",
                            "disagrees with accessToken",
                        ));
                    }
                }
                Ok(access)
            }
            ContractProfile::Lenient => access.or(legacy).ok_or_else(|| {
                ContractError::field("auth response", "token/accessToken", "is missing or empty")
            }),
        }
    }
}

/// Response of `GET /api/auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeResponse {
    Wrapped { user: User },
    Flat(User),
}

impl MeResponse {
    pub fn user(&self) -> &User {
        match self {
            MeResponse::Wrapped { user } | MeResponse::Flat(user) => user,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, MeResponse::Wrapped { .. })
    }
}

/// Response of logout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Search history
// ============================================================================

/// Body of `POST /api/search-history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSearchEntry {
    pub url: String,
    pub title: String,
    pub request_id: String,
}

/// A stored history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHistoryEntry {
    pub url: String,
    pub title: String,
    pub request_id: String,
    pub timestamp: String,
}

impl SearchHistoryEntry {
    pub fn matches(&self, posted: &NewSearchEntry) -> bool {
        self.url == posted.url && self.title == posted.title && self.request_id == posted.request_id
    }
}

/// Response of `POST /api/search-history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchEntryCreated {
    Wrapped { success: bool, entry: SearchHistoryEntry },
    Bare(SearchHistoryEntry),
}

impl SearchEntryCreated {
    pub fn entry(&self) -> &SearchHistoryEntry {
        match self {
            SearchEntryCreated::Wrapped { entry, .. } | SearchEntryCreated::Bare(entry) => entry,
        }
    }
}

/// Response of `GET /api/search-history`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryListing {
    Wrapped { history: Vec<SearchHistoryEntry> },
    Bare(Vec<SearchHistoryEntry>),
}

impl HistoryListing {
    pub fn entries(&self) -> &[SearchHistoryEntry] {
        match self {
            HistoryListing::Wrapped { history } | HistoryListing::Bare(history) => history,
        }
    }

    pub fn is_wrapped(&self) -> bool {
        matches!(self, HistoryListing::Wrapped { .. })
    }
}

// ============================================================================
// Scraping
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserLocation {
    pub country: String,
}

/// Body of `POST /api/scrape` and `POST /api/n8n-scrape`. Every field is
/// optional so that malformed requests can be expressed too.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_location: Option<UserLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub title: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
    pub image: String,
    pub store: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub title: String,
    pub store: String,
    pub price: f64,
    pub currency: String,
    pub url: String,
    pub image: String,
    pub condition: String,
    pub assessment: Map<String, Value>,
}

/// Response of `POST /api/scrape`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResult {
    pub product: Product,
    pub comparisons: Vec<Comparison>,
    pub request_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainProduct {
    pub title: String,
    pub price: String,
    pub image: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub title: String,
    pub standard_price: String,
    /// Empty when the item has no discount
    pub discount_price: String,
    pub site: String,
    pub link: String,
    pub image: String,
}

/// Response of `POST /api/n8n-scrape`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct N8nScrapeResult {
    pub main_product: MainProduct,
    pub suggestions: Vec<Suggestion>,
}

// ============================================================================
// Location
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub country: String,
    pub country_code: String,
    pub region: String,
    pub currency: String,
    pub time_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalDealer {
    pub name: String,
    pub url: String,
    pub country: String,
    pub region: String,
    pub search_url_pattern: String,
    pub currency: String,
    /// Lower is preferred
    pub priority: i64,
}

/// Response of `GET /api/location`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationInfo {
    pub location: Location,
    pub local_dealers: Vec<LocalDealer>,
}

// ============================================================================
// Admin
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    pub created_at: String,
    pub search_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Response of `GET /api/admin/users`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUsersResponse {
    pub users: Vec<AdminUser>,
}

// ============================================================================
// Service endpoints and errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingResponse {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportedCountries {
    pub countries: Vec<Value>,
}

/// Body of a 4xx/5xx response. At least one of `error` or `message` is
/// expected; their JSON type is not constrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: Some(Value::String(error.into())),
            ..Default::default()
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn has_reason(&self) -> bool {
        self.error.is_some() || self.message.is_some()
    }
}

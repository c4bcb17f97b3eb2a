//! The endpoint table of the API under test

use serde::{Deserialize, Serialize};

/// HTTP verbs used by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an endpoint reads the bearer token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRequirement {
    None,
    Optional,
    Bearer,
    Admin,
}

/// Every endpoint the suite exercises
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    Logout,
    Me,
    AddSearch,
    History,
    Scrape,
    N8nScrape,
    Location,
    AdminUsers,
    Ping,
    Health,
    SupportedCountries,
}

impl Endpoint {
    pub const ALL: [Endpoint; 13] = [
        Endpoint::Register,
        Endpoint::Login,
        Endpoint::Logout,
        Endpoint::Me,
        Endpoint::AddSearch,
        Endpoint::History,
        Endpoint::Scrape,
        Endpoint::N8nScrape,
        Endpoint::Location,
        Endpoint::AdminUsers,
        Endpoint::Ping,
        Endpoint::Health,
        Endpoint::SupportedCountries,
    ];

    pub fn method(&self) -> HttpMethod {
        match self {
            Endpoint::Register
            | Endpoint::Login
            | Endpoint::Logout
            | Endpoint::AddSearch
            | Endpoint::Scrape
            | Endpoint::N8nScrape => HttpMethod::Post,
            Endpoint::Me
            | Endpoint::History
            | Endpoint::Location
            | Endpoint::AdminUsers
            | Endpoint::Ping
            | Endpoint::Health
            | Endpoint::SupportedCountries => HttpMethod::Get,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Register => "/api/auth/register",
            Endpoint::Login => "/api/auth/login",
            Endpoint::Logout => "/api/auth/logout",
            Endpoint::Me => "/api/auth/me",
            Endpoint::AddSearch | Endpoint::History => "/api/search-history",
            Endpoint::Scrape => "/api/scrape",
            Endpoint::N8nScrape => "/api/n8n-scrape",
            Endpoint::Location => "/api/location",
            Endpoint::AdminUsers => "/api/admin/users",
            Endpoint::Ping => "/api/ping",
            Endpoint::Health => "/api/health",
            Endpoint::SupportedCountries => "/api/supported-countries",
        }
    }

    /// Older route serving the same contract, if the server keeps one
    pub fn legacy_path(&self) -> Option<&'static str> {
        match self {
            Endpoint::Register => Some("/api/register"),
            Endpoint::Login => Some("/api/login"),
            Endpoint::Logout => Some("/api/logout"),
            Endpoint::Me => Some("/api/user/me"),
            Endpoint::AddSearch | Endpoint::History => Some("/api/user/search-history"),
            _ => None,
        }
    }

    pub fn auth(&self) -> AuthRequirement {
        match self {
            Endpoint::Logout | Endpoint::Me | Endpoint::AddSearch | Endpoint::History => {
                AuthRequirement::Bearer
            }
            Endpoint::AdminUsers => AuthRequirement::Admin,
            Endpoint::Scrape => AuthRequirement::Optional,
            _ => AuthRequirement::None,
        }
    }

    /// Short label used in step names and logs
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::Register => "register",
            Endpoint::Login => "login",
            Endpoint::Logout => "logout",
            Endpoint::Me => "me",
            Endpoint::AddSearch => "add_search",
            Endpoint::History => "history",
            Endpoint::Scrape => "scrape",
            Endpoint::N8nScrape => "n8n_scrape",
            Endpoint::Location => "location",
            Endpoint::AdminUsers => "admin_users",
            Endpoint::Ping => "ping",
            Endpoint::Health => "health",
            Endpoint::SupportedCountries => "supported_countries",
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

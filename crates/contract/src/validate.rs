//! Semantic checks on decoded bodies

use chrono::{DateTime, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{ContractError, Result};
use crate::types::*;

/// Rules a decoded body must satisfy beyond its JSON types
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Decode `body` into `T` and run its checks. `what` names the body in
/// error messages.
pub fn decode<T>(what: &'static str, body: &Value) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let decoded: T = serde_json::from_value(body.clone())
        .map_err(|source| ContractError::Shape { what, source })?;
    decoded.validate()?;
    Ok(decoded)
}

/// Accept RFC 3339 and the common `YYYY-MM-DDTHH:MM:SS[.fff]` variants
/// without an offset.
pub fn check_timestamp(ts: &str) -> Result<()> {
    if !(ts.contains('T') && ts.contains(':')) {
        return Err(ContractError::Timestamp(ts.to_string()));
    }
    if DateTime::parse_from_rfc3339(ts).is_ok() {
        return Ok(());
    }
    const NAIVE: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];
    if NAIVE
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(ts, fmt).is_ok())
    {
        return Ok(());
    }
    Err(ContractError::Timestamp(ts.to_string()))
}

fn non_empty(what: &'static str, field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ContractError::field(what, field, "is empty"));
    }
    Ok(())
}

/// Keys a user object must never carry
const SECRET_KEYS: [&str; 3] = ["password", "passwordHash", "password_hash"];

fn no_secrets(what: &'static str, extra: &Map<String, Value>) -> Result<()> {
    match SECRET_KEYS.iter().find(|k| extra.contains_key(**k)) {
        Some(key) => Err(ContractError::field(what, *key, "must never be returned")),
        None => Ok(()),
    }
}

impl Validate for User {
    fn validate(&self) -> Result<()> {
        non_empty("user", "email", &self.email)?;
        no_secrets("user", &self.extra)
    }
}

impl Validate for AuthResponse {
    fn validate(&self) -> Result<()> {
        if !self.success {
            return Err(ContractError::field("auth response", "success", "is not true"));
        }
        self.user.validate()
    }
}

impl Validate for MeResponse {
    fn validate(&self) -> Result<()> {
        self.user().validate()
    }
}

impl Validate for LogoutResponse {
    fn validate(&self) -> Result<()> {
        if !self.success {
            return Err(ContractError::field("logout response", "success", "is not true"));
        }
        Ok(())
    }
}

impl Validate for SearchHistoryEntry {
    fn validate(&self) -> Result<()> {
        check_timestamp(&self.timestamp)
    }
}

impl Validate for SearchEntryCreated {
    fn validate(&self) -> Result<()> {
        if let SearchEntryCreated::Wrapped { success: false, .. } = self {
            return Err(ContractError::field("created entry", "success", "is not true"));
        }
        self.entry().validate()
    }
}

impl Validate for HistoryListing {
    fn validate(&self) -> Result<()> {
        self.entries().iter().try_for_each(Validate::validate)
    }
}

impl Validate for ScrapeResult {
    fn validate(&self) -> Result<()> {
        let p = &self.product;
        non_empty("product", "title", &p.title)?;
        non_empty("product", "currency", &p.currency)?;
        non_empty("product", "url", &p.url)?;
        non_empty("scrape result", "requestId", &self.request_id)?;
        for (i, c) in self.comparisons.iter().enumerate() {
            non_empty("comparison", &format!("comparisons[{i}].title"), &c.title)?;
        }
        Ok(())
    }
}

impl Validate for N8nScrapeResult {
    fn validate(&self) -> Result<()> {
        let m = &self.main_product;
        non_empty("mainProduct", "title", &m.title)?;
        non_empty("mainProduct", "price", &m.price)?;
        non_empty("mainProduct", "image", &m.image)?;
        non_empty("mainProduct", "url", &m.url)?;
        for (i, s) in self.suggestions.iter().enumerate() {
            let fields = [
                ("title", &s.title),
                ("standardPrice", &s.standard_price),
                ("site", &s.site),
                ("link", &s.link),
                ("image", &s.image),
            ];
            for (name, value) in fields {
                non_empty("suggestion", &format!("suggestions[{i}].{name}"), value)?;
            }
        }
        Ok(())
    }
}

impl Validate for LocationInfo {
    fn validate(&self) -> Result<()> {
        non_empty("location", "countryCode", &self.location.country_code)?;
        for (i, d) in self.local_dealers.iter().enumerate() {
            non_empty("dealer", &format!("localDealers[{i}].name"), &d.name)?;
        }
        Ok(())
    }
}

impl Validate for AdminUsersResponse {
    fn validate(&self) -> Result<()> {
        for (i, u) in self.users.iter().enumerate() {
            non_empty("admin user", &format!("users[{i}].email"), &u.email)?;
            non_empty("admin user", &format!("users[{i}].createdAt"), &u.created_at)?;
            no_secrets("admin user", &u.extra)?;
        }
        Ok(())
    }
}

impl Validate for PingResponse {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl Validate for HealthStatus {
    fn validate(&self) -> Result<()> {
        non_empty("health", "status", &self.status)
    }
}

impl Validate for SupportedCountries {
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

impl Validate for ErrorBody {
    fn validate(&self) -> Result<()> {
        if !self.has_reason() {
            return Err(ContractError::field("error body", "error/message", "is missing"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case("2025-07-19T12:34:56Z" ; "utc")]
    #[test_case("2025-07-19T12:34:56.123+02:00" ; "offset")]
    #[test_case("2025-07-19T12:34:56.789" ; "naive fractional")]
    #[test_case("2025-07-19T12:34:56" ; "naive")]
    fn test_timestamp_accepted(ts: &str) {
        assert!(check_timestamp(ts).is_ok());
    }

    #[test_case("2025-07-19" ; "date only")]
    #[test_case("1752928496" ; "epoch")]
    #[test_case("T:" ; "separators only")]
    fn test_timestamp_rejected(ts: &str) {
        assert!(check_timestamp(ts).is_err());
    }

    #[test]
    fn test_decode_scrape_result() {
        let body = json!({
            "product": {"title": "Phone", "price": 199, "currency": "USD",
                        "url": "https://shop.example/p", "image": "", "store": "shop"},
            "comparisons": [{"title": "Phone", "store": "other", "price": 189.5, "currency": "USD",
                             "url": "https://other.example/p", "image": "", "condition": "new",
                             "assessment": {"verdict": "cheaper"}}],
            "requestId": "abc"
        });
        let res: ScrapeResult = decode("scrape result", &body).unwrap();
        assert_eq!(res.comparisons.len(), 1);
    }

    #[test]
    fn test_decode_rejects_non_object_assessment() {
        let body = json!({
            "product": {"title": "Phone", "price": 1, "currency": "USD",
                        "url": "u", "image": "", "store": "s"},
            "comparisons": [{"title": "P", "store": "o", "price": 1, "currency": "USD",
                             "url": "u", "image": "", "condition": "new", "assessment": "good"}],
            "requestId": "abc"
        });
        let err = decode::<ScrapeResult>("scrape result", &body).unwrap_err();
        assert!(matches!(err, ContractError::Shape { .. }));
    }

    #[test]
    fn test_n8n_allows_empty_discount_only() {
        let mut body = json!({
            "mainProduct": {"title": "T", "price": "10", "image": "i", "url": "u"},
            "suggestions": [{"title": "S", "standardPrice": "9", "discountPrice": "",
                             "site": "s", "link": "l", "image": "i"}]
        });
        assert!(decode::<N8nScrapeResult>("n8n", &body).is_ok());

        body["suggestions"][0]["site"] = json!("  ");
        let err = decode::<N8nScrapeResult>("n8n", &body).unwrap_err();
        assert!(err.to_string().contains("suggestions[0].site"));
    }

    #[test_case("password", json!("TestPass123!") ; "plain password")]
    #[test_case("passwordHash", json!("$2b$10$abcdefghijklmnopqrstuv") ; "camel case hash")]
    #[test_case("password_hash", json!("$2b$10$abcdefghijklmnopqrstuv") ; "snake case hash")]
    fn test_user_must_not_leak_password(key: &str, value: Value) {
        let mut user = json!({"id": 4, "email": "leak@example.com", "isAdmin": false});
        user[key] = value;

        let auth = json!({"success": true, "accessToken": "t", "user": user.clone()});
        let err = decode::<AuthResponse>("auth response", &auth).unwrap_err();
        assert!(err.to_string().contains(key), "{err}");

        assert!(decode::<MeResponse>("current user", &json!({"user": user.clone()})).is_err());
        assert!(decode::<MeResponse>("current user", &user).is_err());
    }

    #[test]
    fn test_user_extra_fields_are_tolerated() {
        let body = json!({
            "user": {"id": 4, "email": "a@example.com", "isAdmin": false, "plan": "free"}
        });
        let me: MeResponse = decode("current user", &body).unwrap();
        assert_eq!(me.user().extra.get("plan"), Some(&json!("free")));
    }

    #[test]
    fn test_admin_listing_must_not_leak_password() {
        let body = json!({"users": [{"id": 1, "email": "a@b.c", "isAdmin": true,
            "createdAt": "2025-01-01T00:00:00Z", "searchCount": 0, "passwordHash": "x"}]});
        assert!(decode::<AdminUsersResponse>("admin user listing", &body).is_err());
    }

    #[test]
    fn test_error_body_needs_reason() {
        assert!(decode::<ErrorBody>("error", &json!({"message": "bad url"})).is_ok());
        assert!(decode::<ErrorBody>("error", &json!({"details": []})).is_err());
    }
}

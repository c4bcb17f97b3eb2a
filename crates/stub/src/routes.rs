//! HTTP handlers for the stub API

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use pavlo_contract::{
    AdminUsersResponse, AuthResponse, ErrorBody, HealthStatus, HistoryListing, LogoutResponse,
    MeResponse, NewSearchEntry, PingResponse, SearchEntryCreated, SupportedCountries, User,
};
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::catalog;
use crate::state::{now_timestamp, StateError, StubState};

type Body = Map<String, Value>;

/// An error response: status plus `{ "error": ... }`
pub struct ApiError(StatusCode, ErrorBody);

impl ApiError {
    fn bad_request(msg: &str) -> Self {
        ApiError(StatusCode::BAD_REQUEST, ErrorBody::new(msg))
    }

    fn unauthorized(msg: &str) -> Self {
        ApiError(StatusCode::UNAUTHORIZED, ErrorBody::new(msg))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        let status = match e {
            StateError::EmailTaken => StatusCode::CONFLICT,
            StateError::BadCredentials | StateError::InvalidToken => StatusCode::UNAUTHORIZED,
        };
        ApiError(status, ErrorBody::new(e.to_string()))
    }
}

type ApiResult<T> = Result<T, ApiError>;

pub fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/ping", get(ping_handler))
        .route("/api/health", get(health_handler))
        .route("/api/supported-countries", get(supported_countries_handler))
        .route("/api/location", get(location_handler).post(location_handler))
        .route("/api/auth/register", post(register_handler))
        .route("/api/auth/login", post(login_handler))
        .route("/api/auth/logout", post(logout_handler))
        .route("/api/auth/me", get(me_handler))
        .route("/api/register", post(register_handler))
        .route("/api/login", post(login_handler))
        .route("/api/logout", post(logout_handler))
        .route("/api/user/me", get(me_handler))
        .route(
            "/api/search-history",
            get(history_handler).post(add_search_handler),
        )
        .route(
            "/api/user/search-history",
            get(history_handler).post(add_search_handler),
        )
        .route("/api/scrape", post(scrape_handler))
        .route("/api/n8n-scrape", post(n8n_scrape_handler))
        .route("/api/admin/users", get(admin_users_handler))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request helpers
// ============================================================================

fn parse_body(bytes: &Bytes) -> ApiResult<Body> {
    if bytes.is_empty() {
        return Ok(Body::new());
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::bad_request("Request body must be a JSON object")),
        Err(_) => Err(ApiError::bad_request("Malformed JSON body")),
    }
}

fn str_field<'a>(body: &'a Body, name: &str) -> Option<&'a str> {
    body.get(name).and_then(Value::as_str)
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn require_user(state: &StubState, headers: &HeaderMap) -> ApiResult<User> {
    let token = bearer(headers).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    Ok(state.user_for_token(token)?)
}

fn country_hint(headers: &HeaderMap) -> Option<&str> {
    headers.get("cf-ipcountry").and_then(|v| v.to_str().ok())
}

fn valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.contains(char::is_whitespace)
                && domain.split('.').count() >= 2
                && domain.split('.').all(|label| !label.is_empty())
        }
        _ => false,
    }
}

/// At least 8 characters with an uppercase letter, a lowercase letter, and a digit
fn strong_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

fn validation_failed(details: Vec<Value>) -> ApiError {
    ApiError(
        StatusCode::BAD_REQUEST,
        ErrorBody::new("Validation failed").with_details(Value::Array(details)),
    )
}

fn parse_target_url(body: &Body) -> ApiResult<url::Url> {
    let raw = str_field(body, "url")
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::bad_request("URL is required"))?;
    match url::Url::parse(raw) {
        Ok(u) if matches!(u.scheme(), "http" | "https") && u.host_str().is_some() => Ok(u),
        _ => Err(ApiError::bad_request("Invalid URL format")),
    }
}

fn session_response(state: &StubState, user: User, status: StatusCode) -> Response {
    let token = state.issue_token(user.id);
    let body = AuthResponse {
        success: true,
        token: Some(token.clone()),
        access_token: Some(token),
        user,
    };
    (status, Json(body)).into_response()
}

// ============================================================================
// Handlers
// ============================================================================

async fn ping_handler() -> Json<PingResponse> {
    Json(PingResponse {
        message: "pong".to_string(),
    })
}

async fn health_handler() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy".to_string(),
        timestamp: Some(now_timestamp()),
    })
}

async fn supported_countries_handler() -> Json<SupportedCountries> {
    Json(SupportedCountries {
        countries: catalog::supported_countries(),
    })
}

async fn location_handler(headers: HeaderMap) -> impl IntoResponse {
    Json(catalog::location_info(country_hint(&headers)))
}

async fn register_handler(
    State(state): State<Arc<StubState>>,
    bytes: Bytes,
) -> ApiResult<Response> {
    let body = parse_body(&bytes)?;
    let email = str_field(&body, "email").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();

    let mut details = Vec::new();
    if !valid_email(email) {
        details.push(json!({"field": "email", "msg": "Please provide a valid email address"}));
    }
    if !strong_password(password) {
        details.push(json!({
            "field": "password",
            "msg": "Password must be at least 8 characters with uppercase, lowercase, and number"
        }));
    }
    if !details.is_empty() {
        return Err(validation_failed(details));
    }

    let user = state.create_account(email, password, false)?;
    debug!(user_id = user.id, "registered");
    Ok(session_response(&state, user, StatusCode::CREATED))
}

async fn login_handler(State(state): State<Arc<StubState>>, bytes: Bytes) -> ApiResult<Response> {
    let body = parse_body(&bytes)?;
    let email = str_field(&body, "email").unwrap_or_default();
    let password = str_field(&body, "password").unwrap_or_default();

    if !valid_email(email) || password.is_empty() {
        return Err(validation_failed(vec![
            json!({"field": "email", "msg": "Email and password are required"}),
        ]));
    }

    let user = state.authenticate(email, password)?;
    Ok(session_response(&state, user, StatusCode::OK))
}

async fn logout_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> ApiResult<Json<LogoutResponse>> {
    let token = bearer(&headers).ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    if !state.revoke(token) {
        return Err(StateError::InvalidToken.into());
    }
    Ok(Json(LogoutResponse { success: true }))
}

async fn me_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> ApiResult<Json<MeResponse>> {
    let user = require_user(&state, &headers)?;
    Ok(Json(MeResponse::Wrapped { user }))
}

async fn add_search_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> ApiResult<Response> {
    let user = require_user(&state, &headers)?;
    let body = parse_body(&bytes)?;

    let (Some(url), Some(title), Some(request_id)) = (
        str_field(&body, "url"),
        str_field(&body, "title"),
        str_field(&body, "requestId"),
    ) else {
        return Err(ApiError::bad_request("url, title and requestId are required"));
    };

    let entry = state.add_history(
        user.id,
        NewSearchEntry {
            url: url.to_string(),
            title: title.to_string(),
            request_id: request_id.to_string(),
        },
    );
    let body = SearchEntryCreated::Wrapped {
        success: true,
        entry,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn history_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> ApiResult<Json<HistoryListing>> {
    let user = require_user(&state, &headers)?;
    Ok(Json(HistoryListing::Wrapped {
        history: state.history(user.id),
    }))
}

async fn scrape_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
    bytes: Bytes,
) -> ApiResult<Response> {
    // Optional auth: a bad token is an error, no token is fine
    if bearer(&headers).is_some() {
        require_user(&state, &headers)?;
    }
    let body = parse_body(&bytes)?;
    let target = parse_target_url(&body)?;
    let request_id = str_field(&body, "requestId")
        .map(String::from)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let country = body
        .get("userLocation")
        .and_then(|l| l.get("country"))
        .and_then(Value::as_str)
        .or_else(|| country_hint(&headers));

    Ok(Json(catalog::scrape(&target, request_id, country)).into_response())
}

async fn n8n_scrape_handler(bytes: Bytes) -> ApiResult<Response> {
    let body = parse_body(&bytes)?;
    let target = parse_target_url(&body)?;
    Ok(Json(catalog::n8n_scrape(&target)).into_response())
}

async fn admin_users_handler(
    State(state): State<Arc<StubState>>,
    headers: HeaderMap,
) -> ApiResult<Json<AdminUsersResponse>> {
    let user = require_user(&state, &headers)?;
    if !user.is_admin {
        return Err(ApiError(
            StatusCode::FORBIDDEN,
            ErrorBody::new("Admin privileges required"),
        ));
    }
    Ok(Json(AdminUsersResponse {
        users: state.admin_listing(),
    }))
}

async fn not_found_handler() -> ApiError {
    ApiError(StatusCode::NOT_FOUND, ErrorBody::new("Not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email() {
        assert!(valid_email("testuser_1a2b3c4d@example.com"));
        assert!(!valid_email("invalid-email-format"));
        assert!(!valid_email("a@b"));
        assert!(!valid_email("a@@b.com"));
        assert!(!valid_email("a b@c.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_strong_password() {
        assert!(strong_password("TestPass123!"));
        assert!(!strong_password("short1A"));
        assert!(!strong_password("alllowercase1"));
        assert!(!strong_password(""));
    }

    #[test]
    fn test_bearer_extraction() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer(&headers), None);
        headers.insert(header::AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, "Basic abc".parse().unwrap());
        assert_eq!(bearer(&headers), None);
    }
}

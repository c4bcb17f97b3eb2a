//! Step execution against the live API

use std::time::{Duration, Instant};

use pavlo_contract::endpoint::HttpMethod;
use pavlo_contract::{
    AdminUsersResponse, AuthRequest, AuthResponse, ContractProfile, Endpoint, HealthStatus,
    HistoryListing, LocationInfo, LogoutResponse, MeResponse, N8nScrapeResult, NewSearchEntry,
    PingResponse, ScrapeRequest, ScrapeResult, SearchEntryCreated, SupportedCountries, User,
    UserLocation,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::client::{ApiClient, ApiResponse};
use crate::config::RunnerConfig;
use crate::context::{Actor, ScenarioContext};
use crate::credentials::{self, Credentials};
use crate::error::{E2eError, E2eResult};
use crate::expect::{check_outcome, decode_body, ensure, Outcome};
use crate::spec::{LoginWith, Step};

/// Product URL posted to history when a step names none
pub const DEFAULT_PRODUCT_URL: &str = "https://example.com/product";
pub const DEFAULT_PRODUCT_TITLE: &str = "Test Product";

/// Success codes for free-form requests
const ANY_2XX: &[u16] = &[200, 201, 202, 204];

/// What a history listing is checked for beyond its shape
#[derive(Debug, Clone, Copy)]
struct HistoryChecks {
    contains_posted: bool,
    excludes_others: bool,
}

/// Result of executing a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub skipped: bool,
    pub step_name: String,
    pub duration_ms: u64,
    /// HTTP status of the call the step made, if any
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Runs scenario steps with one client and one contract profile
#[derive(Debug, Clone)]
pub struct StepExecutor {
    client: ApiClient,
    profile: ContractProfile,
    admin: Option<AuthRequest>,
}

fn route(endpoint: Endpoint, legacy: bool) -> E2eResult<&'static str> {
    if !legacy {
        return Ok(endpoint.path());
    }
    endpoint
        .legacy_path()
        .ok_or_else(|| E2eError::SpecParse(format!("{} has no legacy route", endpoint.label())))
}

/// Actor names become email prefixes
fn email_prefix(actor: &str) -> String {
    let cleaned: String = actor
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "testuser".to_string()
    } else {
        cleaned
    }
}

impl StepExecutor {
    pub fn new(client: ApiClient, profile: ContractProfile, admin: Option<AuthRequest>) -> Self {
        Self {
            client,
            profile,
            admin,
        }
    }

    pub fn from_config(config: &RunnerConfig) -> E2eResult<Self> {
        Ok(Self::new(
            ApiClient::from_config(config)?,
            config.profile,
            config.admin.clone(),
        ))
    }

    pub fn profile(&self) -> ContractProfile {
        self.profile
    }

    /// Execute one step. Failures are reported in the result, not as `Err`.
    pub async fn execute_step(&self, step: &Step, ctx: &mut ScenarioContext) -> StepResult {
        let start = Instant::now();
        let step_name = step.name();
        debug!("Executing step: {}", step_name);

        let result = self.run(step, ctx).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(status) => StepResult {
                success: true,
                skipped: false,
                step_name,
                duration_ms,
                status,
                error: None,
            },
            Err(e) => StepResult {
                success: false,
                skipped: e.is_skip(),
                step_name,
                duration_ms,
                status: None,
                error: Some(e.to_string()),
            },
        }
    }

    async fn run(&self, step: &Step, ctx: &mut ScenarioContext) -> E2eResult<Option<u16>> {
        let status = match step {
            Step::Register {
                actor,
                payload,
                reuse,
                is_admin,
                legacy,
                expect,
            } => {
                self.register(
                    ctx,
                    actor,
                    payload.as_ref(),
                    reuse.as_deref(),
                    *is_admin,
                    *legacy,
                    expect,
                )
                .await?
            }
            Step::Login {
                actor,
                with,
                legacy,
                expect,
            } => self.login(ctx, actor, *with, *legacy, expect).await?,
            Step::Logout {
                actor,
                legacy,
                expect,
            } => self.logout(ctx, actor, *legacy, expect).await?,
            Step::Me {
                actor,
                token,
                legacy,
                expect,
            } => self.me(ctx, actor.as_deref(), token.as_deref(), *legacy, expect).await?,
            Step::AddSearch {
                actor,
                url,
                title,
                from_scrape,
                expect,
            } => {
                self.add_search(ctx, actor, url.as_deref(), title.as_deref(), *from_scrape, expect)
                    .await?
            }
            Step::History {
                actor,
                contains_posted,
                excludes_others,
                expect,
            } => {
                let checks = HistoryChecks {
                    contains_posted: *contains_posted,
                    excludes_others: *excludes_others,
                };
                self.history(ctx, actor.as_deref(), checks, expect).await?
            }
            Step::Scrape {
                actor,
                url,
                country,
                with_request_id,
                expect,
            } => {
                self.scrape(
                    ctx,
                    actor.as_deref(),
                    url.as_deref(),
                    country.as_deref(),
                    *with_request_id,
                    expect,
                )
                .await?
            }
            Step::N8nScrape {
                url,
                country,
                expect,
            } => self.n8n_scrape(url.as_deref(), country.as_deref(), expect).await?,
            Step::Location { expect } => {
                let resp = self.client.location().await?;
                self.check(&resp, Endpoint::Location, expect)?;
                if expect.is_success() {
                    let info: LocationInfo = decode_body(&resp, "location")?;
                    debug!(
                        "Location {} with {} dealer(s)",
                        info.location.country_code,
                        info.local_dealers.len()
                    );
                }
                resp.status
            }
            Step::RequireAdmin { actor } => match self.require_admin(ctx, actor).await? {
                Some(status) => status,
                None => return Ok(None),
            },
            Step::AdminUsers {
                actor,
                includes,
                expect,
            } => self.admin_users(ctx, actor.as_deref(), includes, expect).await?,
            Step::Ping { expect } => {
                let resp = self.client.ping().await?;
                self.check(&resp, Endpoint::Ping, expect)?;
                if expect.is_success() {
                    decode_body::<PingResponse>(&resp, "ping")?;
                }
                resp.status
            }
            Step::Health { expect } => {
                let resp = self.client.health().await?;
                self.check(&resp, Endpoint::Health, expect)?;
                if expect.is_success() {
                    let health: HealthStatus = decode_body(&resp, "health")?;
                    ensure(health.is_healthy(), || {
                        format!("health status is {:?}, expected \"healthy\"", health.status)
                    })?;
                }
                resp.status
            }
            Step::SupportedCountries { expect } => {
                let resp = self.client.supported_countries().await?;
                self.check(&resp, Endpoint::SupportedCountries, expect)?;
                if expect.is_success() {
                    decode_body::<SupportedCountries>(&resp, "supported countries")?;
                }
                resp.status
            }
            Step::Request {
                method,
                path,
                actor,
                body,
                contains,
                expect,
            } => {
                let token = ctx.token_for(actor.as_deref())?;
                let resp = self.client.send(*method, path, token, body.as_ref()).await?;
                check_outcome(&resp, expect, ANY_2XX)?;
                if expect.is_success() {
                    for key in contains {
                        ensure(resp.body.get(key).is_some(), || {
                            format!("{} body lacks `{}`: {}", resp.describe(), key, resp.snippet())
                        })?;
                    }
                }
                resp.status
            }
            Step::Sleep { ms } => {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
                return Ok(None);
            }
            Step::Log { message } => {
                info!("[SCENARIO LOG] {}", message);
                return Ok(None);
            }
        };
        Ok(Some(status))
    }

    fn check(&self, resp: &ApiResponse, endpoint: Endpoint, expect: &Outcome) -> E2eResult<()> {
        check_outcome(resp, expect, self.profile.success_codes(endpoint))
    }

    /// Decode an auth response and store the session on `actor`
    fn accept_session(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
        creds: Option<Credentials>,
        resp: &ApiResponse,
    ) -> E2eResult<User> {
        let auth: AuthResponse = decode_body(resp, "auth response")?;
        let token = auth
            .bearer(self.profile)
            .map_err(|e| E2eError::contract(resp.describe(), e))?
            .to_string();

        if let Some(creds) = &creds {
            ensure(auth.user.email.eq_ignore_ascii_case(&creds.email), || {
                format!(
                    "{} returned user {} for {}",
                    resp.describe(),
                    auth.user.email,
                    creds.email
                )
            })?;
        }

        let entry = ctx.actor_mut(actor);
        if creds.is_some() {
            entry.credentials = creds;
        }
        entry.token = Some(token);
        entry.user = Some(auth.user.clone());
        Ok(auth.user)
    }

    #[allow(clippy::too_many_arguments)]
    async fn register(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
        payload: Option<&Value>,
        reuse: Option<&str>,
        is_admin: Option<bool>,
        legacy: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let path = route(Endpoint::Register, legacy)?;

        let (resp, creds) = match payload {
            Some(payload) => {
                let resp = if legacy {
                    self.client.send(HttpMethod::Post, path, None, Some(payload)).await?
                } else {
                    self.client.register_raw(payload).await?
                };
                let creds = serde_json::from_value::<AuthRequest>(payload.clone())
                    .ok()
                    .map(Credentials::from);
                (resp, creds)
            }
            None => {
                let creds = match reuse {
                    Some(other) => ctx.credentials(other)?.clone(),
                    None => Credentials::generate(&email_prefix(actor)),
                };
                let resp = self
                    .client
                    .send(HttpMethod::Post, path, None, Some(&creds.request()))
                    .await?;
                (resp, Some(creds))
            }
        };

        self.check(&resp, Endpoint::Register, expect)?;
        if resp.is_success() {
            let user = self.accept_session(ctx, actor, creds, &resp)?;
            if let Some(want) = is_admin {
                ensure(user.is_admin == want, || {
                    format!(
                        "{} registered with isAdmin={}, expected {}",
                        user.email, user.is_admin, want
                    )
                })?;
            }
        }
        Ok(resp.status)
    }

    async fn login(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
        with: LoginWith,
        legacy: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let creds = ctx.credentials(actor)?.clone();
        let known_id = ctx.actor(actor)?.user.as_ref().map(|u| u.id);
        let body = match with {
            LoginWith::Correct => creds.request(),
            LoginWith::WrongPassword => creds.with_wrong_password(),
            LoginWith::UnknownEmail => creds.unknown_email(),
        };

        let resp = if legacy {
            let path = route(Endpoint::Login, true)?;
            self.client.send(HttpMethod::Post, path, None, Some(&body)).await?
        } else {
            self.client.login(&body).await?
        };
        self.check(&resp, Endpoint::Login, expect)?;

        if resp.is_success() {
            let user = self.accept_session(ctx, actor, Some(creds), &resp)?;
            if let Some(id) = known_id {
                ensure(user.id == id, || {
                    format!("login returned user id {}, registration returned {}", user.id, id)
                })?;
            }
        }
        Ok(resp.status)
    }

    async fn logout(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
        legacy: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = ctx.token(actor)?.to_string();
        let resp = if legacy {
            let path = route(Endpoint::Logout, true)?;
            self.client.send::<Value>(HttpMethod::Post, path, Some(token.as_str()), None).await?
        } else {
            self.client.logout(Some(token.as_str())).await?
        };
        self.check(&resp, Endpoint::Logout, expect)?;

        // Lenient servers may answer 204 with no body
        let body_required = !self.profile.is_lenient() || !resp.body.is_null();
        if expect.is_success() && body_required {
            let ack: LogoutResponse = decode_body(&resp, "logout response")?;
            debug!("Logged out {} (success={})", actor, ack.success);
        }
        Ok(resp.status)
    }

    async fn me(
        &self,
        ctx: &mut ScenarioContext,
        actor: Option<&str>,
        token: Option<&str>,
        legacy: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = match (token, actor) {
            (Some(literal), _) => Some(literal.to_string()),
            (None, Some(name)) => Some(ctx.token(name)?.to_string()),
            (None, None) => None,
        };

        let resp = if legacy {
            let path = route(Endpoint::Me, true)?;
            self.client.send::<Value>(HttpMethod::Get, path, token.as_deref(), None).await?
        } else {
            self.client.me(token.as_deref()).await?
        };
        self.check(&resp, Endpoint::Me, expect)?;

        if expect.is_success() {
            let me: MeResponse = decode_body(&resp, "current user")?;
            if !self.profile.is_lenient() {
                ensure(me.is_wrapped(), || {
                    format!(
                        "{} must wrap the user as {{\"user\": ...}}: {}",
                        resp.describe(),
                        resp.snippet()
                    )
                })?;
            }
            let known = actor
                .and_then(|name| ctx.get(name))
                .and_then(|a| a.user.as_ref());
            if let Some(known) = known {
                let user = me.user();
                let same = user.id == known.id && user.email.eq_ignore_ascii_case(&known.email);
                ensure(same, || {
                    format!(
                        "current user is {} (id {}), expected {} (id {})",
                        user.email, user.id, known.email, known.id
                    )
                })?;
            }
        }
        Ok(resp.status)
    }

    async fn add_search(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
        url: Option<&str>,
        title: Option<&str>,
        from_scrape: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = ctx.token(actor)?.to_string();
        let entry = if from_scrape {
            let scrape = ctx.last_scrape().ok_or_else(|| E2eError::StepFailed {
                step: format!("add_search({actor})"),
                reason: "no earlier scrape result to take a request id from".to_string(),
            })?;
            NewSearchEntry {
                url: url.map(String::from).unwrap_or_else(|| scrape.product.url.clone()),
                title: title.map(String::from).unwrap_or_else(|| scrape.product.title.clone()),
                request_id: scrape.request_id.clone(),
            }
        } else {
            NewSearchEntry {
                url: url.unwrap_or(DEFAULT_PRODUCT_URL).to_string(),
                title: title.unwrap_or(DEFAULT_PRODUCT_TITLE).to_string(),
                request_id: credentials::request_id(),
            }
        };

        let resp = self.client.add_search(Some(token.as_str()), &entry).await?;
        self.check(&resp, Endpoint::AddSearch, expect)?;

        if expect.is_success() {
            if !self.profile.is_lenient() || !resp.body.is_null() {
                let created: SearchEntryCreated = decode_body(&resp, "created history entry")?;
                ensure(created.entry().matches(&entry), || {
                    format!("created entry {:?} does not echo {:?}", created.entry(), entry)
                })?;
            }
            ctx.actor_mut(actor).posted.push(entry);
        }
        Ok(resp.status)
    }

    async fn history(
        &self,
        ctx: &mut ScenarioContext,
        actor: Option<&str>,
        checks: HistoryChecks,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = ctx.token_for(actor)?;
        let resp = self.client.history(token).await?;
        self.check(&resp, Endpoint::History, expect)?;

        if !expect.is_success() {
            return Ok(resp.status);
        }
        let listing: HistoryListing = decode_body(&resp, "search history")?;
        if !self.profile.is_lenient() {
            ensure(listing.is_wrapped(), || {
                format!("{} must wrap entries as {{\"history\": [...]}}", resp.describe())
            })?;
        }
        let Some(name) = actor else {
            return Ok(resp.status);
        };
        let entries = listing.entries();

        if checks.contains_posted {
            for posted in &ctx.actor(name)?.posted {
                ensure(entries.iter().any(|e| e.matches(posted)), || {
                    format!(
                        "history of {} lacks entry with requestId {}",
                        name, posted.request_id
                    )
                })?;
            }
        }
        if checks.excludes_others {
            for (other, posted) in ctx.posted_by_others(name) {
                ensure(
                    entries.iter().all(|e| e.request_id != posted.request_id),
                    || {
                        format!(
                            "history of {} holds entry {} posted by {}",
                            name, posted.request_id, other
                        )
                    },
                )?;
            }
        }
        Ok(resp.status)
    }

    #[allow(clippy::too_many_arguments)]
    async fn scrape(
        &self,
        ctx: &mut ScenarioContext,
        actor: Option<&str>,
        url: Option<&str>,
        country: Option<&str>,
        with_request_id: bool,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = ctx.token_for(actor)?.map(String::from);
        let request_id = with_request_id.then(credentials::request_id);
        let request = ScrapeRequest {
            url: url.map(String::from),
            request_id: request_id.clone(),
            user_location: country.map(|c| UserLocation { country: c.to_string() }),
        };

        let resp = self.client.scrape(token.as_deref(), &request).await?;
        self.check(&resp, Endpoint::Scrape, expect)?;

        if expect.is_success() {
            let result: ScrapeResult = decode_body(&resp, "scrape result")?;
            if let Some(id) = &request_id {
                ensure(&result.request_id == id, || {
                    format!("scrape echoed requestId {}, sent {}", result.request_id, id)
                })?;
            }
            debug!(
                "Scraped {} with {} comparison(s)",
                result.product.title,
                result.comparisons.len()
            );
            ctx.set_last_scrape(result);
        }
        Ok(resp.status)
    }

    async fn n8n_scrape(
        &self,
        url: Option<&str>,
        country: Option<&str>,
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let request = ScrapeRequest {
            url: url.map(String::from),
            request_id: None,
            user_location: country.map(|c| UserLocation { country: c.to_string() }),
        };
        let resp = self.client.n8n_scrape(&request).await?;
        self.check(&resp, Endpoint::N8nScrape, expect)?;
        if expect.is_success() {
            let result: N8nScrapeResult = decode_body(&resp, "workflow scrape result")?;
            debug!("Workflow returned {} suggestion(s)", result.suggestions.len());
        }
        Ok(resp.status)
    }

    /// `Ok(None)` when the actor already holds an admin session
    async fn require_admin(
        &self,
        ctx: &mut ScenarioContext,
        actor: &str,
    ) -> E2eResult<Option<u16>> {
        let ready = ctx
            .get(actor)
            .map(|a: &Actor| a.is_admin() && a.token.is_some())
            .unwrap_or(false);
        if ready {
            return Ok(None);
        }

        let Some(admin) = &self.admin else {
            return Err(E2eError::Skipped(format!(
                "no admin account for {actor}; set PAVLO_ADMIN_EMAIL and PAVLO_ADMIN_PASSWORD"
            )));
        };

        let resp = self.client.login(admin).await?;
        self.check(&resp, Endpoint::Login, &Outcome::Success)?;
        let user = self.accept_session(ctx, actor, Some(Credentials::from(admin.clone())), &resp)?;
        ensure(user.is_admin, || {
            format!("configured admin {} is not an administrator", admin.email)
        })?;
        Ok(Some(resp.status))
    }

    async fn admin_users(
        &self,
        ctx: &mut ScenarioContext,
        actor: Option<&str>,
        includes: &[String],
        expect: &Outcome,
    ) -> E2eResult<u16> {
        let token = ctx.token_for(actor)?;
        let resp = self.client.admin_users(token).await?;
        self.check(&resp, Endpoint::AdminUsers, expect)?;

        if expect.is_success() {
            let listing: AdminUsersResponse = decode_body(&resp, "admin user listing")?;
            for name in includes {
                let email = &ctx.credentials(name)?.email;
                ensure(
                    listing.users.iter().any(|u| u.email.eq_ignore_ascii_case(email)),
                    || format!("admin listing lacks {} ({})", name, email),
                )?;
            }
        }
        Ok(resp.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("alice", "alice")]
    #[test_case("Second User", "second_user")]
    #[test_case("", "testuser")]
    fn test_email_prefix(actor: &str, expected: &str) {
        assert_eq!(email_prefix(actor), expected);
    }

    #[test]
    fn test_legacy_routes() {
        assert_eq!(route(Endpoint::Me, false).unwrap(), "/api/auth/me");
        assert_eq!(route(Endpoint::Me, true).unwrap(), "/api/user/me");
        assert!(route(Endpoint::Scrape, true).is_err());
    }

    #[tokio::test]
    async fn test_require_admin_skips_without_credentials() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let executor = StepExecutor::new(client, ContractProfile::Canonical, None);
        let mut ctx = ScenarioContext::new();

        let step = Step::RequireAdmin {
            actor: "admin".to_string(),
        };
        let result = executor.execute_step(&step, &mut ctx).await;
        assert!(!result.success);
        assert!(result.skipped);
        assert!(result.error.unwrap().contains("PAVLO_ADMIN_EMAIL"));
    }

    #[tokio::test]
    async fn test_log_and_sleep_need_no_server() {
        let client = ApiClient::new("http://127.0.0.1:1", Duration::from_secs(1)).unwrap();
        let executor = StepExecutor::new(client, ContractProfile::Lenient, None);
        let mut ctx = ScenarioContext::new();

        let log = executor
            .execute_step(&Step::Log { message: "hello".to_string() }, &mut ctx)
            .await;
        assert!(log.success);
        assert_eq!(log.status, None);

        let sleep = executor.execute_step(&Step::Sleep { ms: 1 }, &mut ctx).await;
        assert!(sleep.success);
    }
}

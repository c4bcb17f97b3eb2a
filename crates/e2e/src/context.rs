//! Per-scenario state: named actors and what they have done so far

use std::collections::HashMap;

use pavlo_contract::{NewSearchEntry, ScrapeResult, User};

use crate::credentials::Credentials;
use crate::error::{E2eError, E2eResult};

/// A named identity inside one scenario
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub credentials: Option<Credentials>,
    /// Last token issued to this actor. Kept after logout.
    pub token: Option<String>,
    pub user: Option<User>,
    /// Entries this actor posted, in order
    pub posted: Vec<NewSearchEntry>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map(|u| u.is_admin).unwrap_or(false)
    }
}

#[derive(Debug, Default)]
pub struct ScenarioContext {
    actors: HashMap<String, Actor>,
    last_scrape: Option<ScrapeResult>,
}

impl ScenarioContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn actor(&self, name: &str) -> E2eResult<&Actor> {
        self.actors
            .get(name)
            .ok_or_else(|| E2eError::UnknownActor(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Actor> {
        self.actors.get(name)
    }

    /// The actor, created empty on first use
    pub fn actor_mut(&mut self, name: &str) -> &mut Actor {
        self.actors.entry(name.to_string()).or_default()
    }

    pub fn credentials(&self, name: &str) -> E2eResult<&Credentials> {
        self.actor(name)?.credentials.as_ref().ok_or_else(|| E2eError::StepFailed {
            step: name.to_string(),
            reason: "actor has no credentials; register it first".to_string(),
        })
    }

    pub fn token(&self, name: &str) -> E2eResult<&str> {
        self.actor(name)?.token.as_deref().ok_or_else(|| E2eError::StepFailed {
            step: name.to_string(),
            reason: "actor holds no token; register or log in first".to_string(),
        })
    }

    /// Token for an optional actor (None = unauthenticated)
    pub fn token_for(&self, name: Option<&str>) -> E2eResult<Option<&str>> {
        name.map(|n| self.token(n)).transpose()
    }

    /// Entries posted by actors other than `name`, skipping actors that
    /// share its account
    pub fn posted_by_others<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a NewSearchEntry)> + 'a {
        let own_id = self.get(name).and_then(|a| a.user.as_ref()).map(|u| u.id);
        self.actors
            .iter()
            .filter(move |(other, actor)| {
                other.as_str() != name
                    && (own_id.is_none() || actor.user.as_ref().map(|u| u.id) != own_id)
            })
            .flat_map(|(other, actor)| actor.posted.iter().map(move |e| (other.as_str(), e)))
    }

    pub fn last_scrape(&self) -> Option<&ScrapeResult> {
        self.last_scrape.as_ref()
    }

    pub fn set_last_scrape(&mut self, result: ScrapeResult) {
        self.last_scrape = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_actor() {
        let ctx = ScenarioContext::new();
        assert!(matches!(ctx.actor("ghost"), Err(E2eError::UnknownActor(_))));
        assert!(ctx.token_for(None).unwrap().is_none());
    }

    #[test]
    fn test_token_requires_login() {
        let mut ctx = ScenarioContext::new();
        ctx.actor_mut("alice").credentials = Some(Credentials::generate("alice"));
        assert!(ctx.credentials("alice").is_ok());
        assert!(matches!(ctx.token("alice"), Err(E2eError::StepFailed { .. })));

        ctx.actor_mut("alice").token = Some("abc".to_string());
        assert_eq!(ctx.token_for(Some("alice")).unwrap(), Some("abc"));
        assert!(!ctx.actor("alice").unwrap().is_admin());
    }

    fn entry(request_id: &str) -> NewSearchEntry {
        NewSearchEntry {
            url: "https://example.com/p".to_string(),
            title: "P".to_string(),
            request_id: request_id.to_string(),
        }
    }

    fn user(id: i64) -> User {
        User {
            id,
            email: format!("u{id}@example.com"),
            is_admin: false,
            created_at: None,
            search_count: None,
            extra: Default::default(),
        }
    }

    #[test]
    fn test_posted_by_others_skips_same_account() {
        let mut ctx = ScenarioContext::new();
        ctx.actor_mut("alice").user = Some(user(1));
        ctx.actor_mut("alice").posted.push(entry("a-1"));
        ctx.actor_mut("bob").user = Some(user(2));
        ctx.actor_mut("bob").posted.push(entry("b-1"));
        ctx.actor_mut("alice_again").user = Some(user(1));
        ctx.actor_mut("alice_again").posted.push(entry("a-2"));

        let others: Vec<_> = ctx
            .posted_by_others("alice")
            .map(|(who, e)| (who.to_string(), e.request_id.clone()))
            .collect();
        assert_eq!(others, vec![("bob".to_string(), "b-1".to_string())]);
    }
}

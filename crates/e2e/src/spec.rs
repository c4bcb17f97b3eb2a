//! Declarative YAML scenarios

use std::path::Path;

use pavlo_contract::endpoint::HttpMethod;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{E2eError, E2eResult};
use crate::expect::Outcome;

/// A complete scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Steps to execute in order
    pub steps: Vec<Step>,
}

/// Which credentials a login step sends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginWith {
    #[default]
    Correct,
    WrongPassword,
    UnknownEmail,
}

fn default_true() -> bool {
    true
}

/// A single step. Actors are named identities local to one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Register an actor with fresh credentials, another actor's
    /// credentials (`reuse`), or a raw `payload`
    Register {
        actor: String,
        #[serde(default)]
        payload: Option<Value>,
        #[serde(default)]
        reuse: Option<String>,
        #[serde(default)]
        is_admin: Option<bool>,
        #[serde(default)]
        legacy: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Log an actor in
    Login {
        actor: String,
        #[serde(default)]
        with: LoginWith,
        #[serde(default)]
        legacy: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Log out with the actor's current token. The token is kept so later
    /// steps can prove it was invalidated.
    Logout {
        actor: String,
        #[serde(default)]
        legacy: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Fetch the current user (no actor = no token)
    Me {
        #[serde(default)]
        actor: Option<String>,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        legacy: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Post a search-history entry with a fresh request id, or the last
    /// scrape's request id when `from_scrape` is set
    AddSearch {
        actor: String,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        from_scrape: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Fetch history. By default every entry the actor posted must appear
    /// and no entry posted by another actor may.
    History {
        #[serde(default)]
        actor: Option<String>,
        #[serde(default = "default_true")]
        contains_posted: bool,
        #[serde(default = "default_true")]
        excludes_others: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Scrape a product URL (omit `url` to send none)
    Scrape {
        #[serde(default)]
        actor: Option<String>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        country: Option<String>,
        #[serde(default = "default_true")]
        with_request_id: bool,
        #[serde(default)]
        expect: Outcome,
    },

    /// Scrape through the workflow webhook
    N8nScrape {
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        country: Option<String>,
        #[serde(default)]
        expect: Outcome,
    },

    /// Geolocation and local dealers
    Location {
        #[serde(default)]
        expect: Outcome,
    },

    /// Make sure `actor` holds an admin token: either it registered as an
    /// admin, or the configured admin account is logged in under that
    /// name. Skips the scenario when neither is possible.
    RequireAdmin { actor: String },

    /// List all users; `includes` names actors whose emails must appear
    AdminUsers {
        #[serde(default)]
        actor: Option<String>,
        #[serde(default)]
        includes: Vec<String>,
        #[serde(default)]
        expect: Outcome,
    },

    Ping {
        #[serde(default)]
        expect: Outcome,
    },

    Health {
        #[serde(default)]
        expect: Outcome,
    },

    SupportedCountries {
        #[serde(default)]
        expect: Outcome,
    },

    /// Arbitrary request; `contains` lists top-level keys required on 2xx
    Request {
        method: HttpMethod,
        path: String,
        #[serde(default)]
        actor: Option<String>,
        #[serde(default)]
        body: Option<Value>,
        #[serde(default)]
        contains: Vec<String>,
        #[serde(default)]
        expect: Outcome,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },

    /// Log a message
    Log { message: String },
}

impl Step {
    /// Short label for results and logs
    pub fn name(&self) -> String {
        fn who(actor: &Option<String>) -> &str {
            actor.as_deref().unwrap_or("anonymous")
        }
        match self {
            Step::Register { actor, .. } => format!("register({actor})"),
            Step::Login { actor, with, .. } => match with {
                LoginWith::Correct => format!("login({actor})"),
                LoginWith::WrongPassword => format!("login({actor}, wrong password)"),
                LoginWith::UnknownEmail => format!("login({actor}, unknown email)"),
            },
            Step::Logout { actor, .. } => format!("logout({actor})"),
            Step::Me { actor, .. } => format!("me({})", who(actor)),
            Step::AddSearch { actor, .. } => format!("add_search({actor})"),
            Step::History { actor, .. } => format!("history({})", who(actor)),
            Step::Scrape { actor, .. } => format!("scrape({})", who(actor)),
            Step::N8nScrape { .. } => "n8n_scrape".to_string(),
            Step::Location { .. } => "location".to_string(),
            Step::RequireAdmin { actor } => format!("require_admin({actor})"),
            Step::AdminUsers { actor, .. } => format!("admin_users({})", who(actor)),
            Step::Ping { .. } => "ping".to_string(),
            Step::Health { .. } => "health".to_string(),
            Step::SupportedCountries { .. } => "supported_countries".to_string(),
            Step::Request { method, path, .. } => format!("{method} {path}"),
            Step::Sleep { ms } => format!("sleep({ms}ms)"),
            Step::Log { .. } => "log".to_string(),
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        if scenario.steps.is_empty() {
            return Err(E2eError::SpecParse(format!("scenario {} has no steps", scenario.name)));
        }
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::SpecParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, sorted by file path
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        paths.iter().map(|p| Self::from_file(p)).collect()
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios.iter().filter(|s| s.has_tag(tag)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_logout_scenario() {
        let yaml = r#"
name: logout-invalidates-token
tags: [auth, smoke]
steps:
  - action: register
    actor: alice
  - action: login
    actor: alice
  - action: logout
    actor: alice
  - action: me
    actor: alice
    expect: unauthorized
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.steps.len(), 4);
        assert!(scenario.has_tag("smoke"));
        match &scenario.steps[3] {
            Step::Me { actor, expect, .. } => {
                assert_eq!(actor.as_deref(), Some("alice"));
                assert_eq!(*expect, Outcome::Unauthorized);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn test_parse_defaults_and_payloads() {
        let yaml = r#"
name: defaults
steps:
  - action: register
    actor: empty
    payload: {}
    expect: rejected
  - action: login
    actor: empty
    with: wrong_password
    expect:
      status: [400, 401]
  - action: history
    actor: empty
  - action: request
    method: GET
    path: /api/ping
    contains: [message]
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        match &scenario.steps[0] {
            Step::Register { payload, expect, legacy, .. } => {
                assert_eq!(payload.as_ref().unwrap(), &serde_json::json!({}));
                assert_eq!(*expect, Outcome::Rejected);
                assert!(!legacy);
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[1] {
            Step::Login { with, expect, .. } => {
                assert_eq!(*with, LoginWith::WrongPassword);
                assert_eq!(*expect, Outcome::Status(vec![400, 401]));
            }
            other => panic!("unexpected step {other:?}"),
        }
        match &scenario.steps[2] {
            Step::History {
                contains_posted,
                excludes_others,
                expect,
                ..
            } => {
                assert!(*contains_posted);
                assert!(*excludes_others);
                assert_eq!(*expect, Outcome::Success);
            }
            other => panic!("unexpected step {other:?}"),
        }
        assert_eq!(scenario.steps[3].name(), "GET /api/ping");
    }

    #[test]
    fn test_empty_scenario_is_rejected() {
        let err = Scenario::from_yaml("name: nothing\nsteps: []\n").unwrap_err();
        assert!(matches!(err, E2eError::SpecParse(_)));
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let yaml = "name: bad\nsteps:\n  - action: teleport\n";
        assert!(Scenario::from_yaml(yaml).is_err());
    }
}

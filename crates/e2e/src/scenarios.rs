//! Scenarios compiled into the binary

use crate::error::{E2eError, E2eResult};
use crate::spec::Scenario;

const BUILTIN: &[(&str, &str)] = &[
    ("tc001_register.yaml", include_str!("../scenarios/tc001_register.yaml")),
    ("tc001_duplicate_email.yaml", include_str!("../scenarios/tc001_duplicate_email.yaml")),
    ("tc002_login.yaml", include_str!("../scenarios/tc002_login.yaml")),
    ("tc003_logout.yaml", include_str!("../scenarios/tc003_logout.yaml")),
    ("tc004_me.yaml", include_str!("../scenarios/tc004_me.yaml")),
    ("tc005_add_search.yaml", include_str!("../scenarios/tc005_add_search.yaml")),
    ("tc006_history.yaml", include_str!("../scenarios/tc006_history.yaml")),
    ("tc007_scrape.yaml", include_str!("../scenarios/tc007_scrape.yaml")),
    ("tc008_n8n_scrape.yaml", include_str!("../scenarios/tc008_n8n_scrape.yaml")),
    ("tc009_location.yaml", include_str!("../scenarios/tc009_location.yaml")),
    ("tc010_admin_users.yaml", include_str!("../scenarios/tc010_admin_users.yaml")),
    ("service_endpoints.yaml", include_str!("../scenarios/service_endpoints.yaml")),
    ("legacy_aliases.yaml", include_str!("../scenarios/legacy_aliases.yaml")),
];

/// Parse every built-in scenario, in a fixed order
pub fn builtin() -> E2eResult<Vec<Scenario>> {
    BUILTIN
        .iter()
        .map(|(file, yaml)| {
            Scenario::from_yaml(yaml).map_err(|e| E2eError::SpecParse(format!("{file}: {e}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_builtin_scenarios_parse() {
        let scenarios = builtin().unwrap();
        assert_eq!(scenarios.len(), BUILTIN.len());

        let names: HashSet<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), scenarios.len(), "scenario names must be unique");
        for name in [
            "register-new-user",
            "user-login",
            "user-logout",
            "current-user",
            "add-search-entry",
            "search-history",
            "scrape-product",
            "n8n-scrape",
            "location",
            "admin-users",
        ] {
            assert!(names.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_smoke_tag() {
        let scenarios = builtin().unwrap();
        let smoke = Scenario::filter_by_tag(&scenarios, "smoke");
        assert!(smoke.iter().any(|s| s.name == "user-logout"));
        assert!(!smoke.iter().any(|s| s.name == "admin-users"));
    }
}

//! Runner configuration
//!
//! Layered: built-in defaults, then an optional TOML file, then `PAVLO_*`
//! environment variables. The binary applies its CLI flags last.

use std::path::{Path, PathBuf};
use std::time::Duration;

use pavlo_contract::{AuthRequest, ContractProfile, DEFAULT_BASE_URL};
use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::server::ServerConfig;

/// Per-request timeout used unless overridden
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Base URL of the system under test
    pub base_url: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Which response-shape variants are accepted
    pub profile: ContractProfile,

    /// Pre-provisioned admin account for the admin scenarios
    pub admin: Option<AuthRequest>,

    /// Health probe and optional launch of the server
    pub server: ServerConfig,

    /// Directory of YAML scenarios (None = built-in scenarios)
    pub specs_dir: Option<PathBuf>,

    /// Output directory for results
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            profile: ContractProfile::default(),
            admin: None,
            server: ServerConfig::default(),
            specs_dir: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

impl RunnerConfig {
    /// Defaults, overlaid with `path` if given, overlaid with the environment
    pub fn load(path: Option<&Path>) -> E2eResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml(&std::fs::read_to_string(path)?)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> E2eResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `PAVLO_*` overrides using `lookup` to read variables. Values
    /// that do not parse are errors.
    pub fn apply_env<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = var("PAVLO_BASE_URL") {
            self.base_url = url;
        }
        if let Some(secs) = var("PAVLO_TIMEOUT_SECS") {
            self.timeout_secs = secs.trim().parse().map_err(|e| {
                E2eError::Config(format!("PAVLO_TIMEOUT_SECS {secs:?}: {e}"))
            })?;
        }
        if let Some(profile) = var("PAVLO_PROFILE") {
            self.profile = profile
                .parse()
                .map_err(|e| E2eError::Config(format!("PAVLO_PROFILE: {e}")))?;
        }
        let admin = (var("PAVLO_ADMIN_EMAIL"), var("PAVLO_ADMIN_PASSWORD"));
        if let (Some(email), Some(password)) = admin {
            self.admin = Some(AuthRequest { email, password });
        }
        if let Some(cmd) = var("PAVLO_SERVER_COMMAND") {
            self.server.command = Some(cmd);
        }
        if let Some(path) = var("PAVLO_HEALTH_PATH") {
            self.server.health_path = path;
        }
        if let Some(dir) = var("PAVLO_SPECS_DIR") {
            self.specs_dir = Some(PathBuf::from(dir));
        }
        if let Some(dir) = var("PAVLO_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn validate(&self) -> E2eResult<()> {
        let url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| E2eError::Config(format!("base_url {:?}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(E2eError::Config(format!(
                "base_url must be http(s), got {}",
                url.scheme()
            )));
        }
        if self.timeout_secs == 0 {
            return Err(E2eError::Config("timeout_secs must be positive".to_string()));
        }
        if !self.server.health_path.starts_with('/') {
            return Err(E2eError::Config(format!(
                "health_path must start with '/', got {:?}",
                self.server.health_path
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_case::test_case;

    #[test]
    fn test_defaults() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.profile, ContractProfile::Canonical);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let config = RunnerConfig::from_toml(
            r#"
base_url = "https://staging.example.com/"
profile = "lenient"

[admin]
email = "admin@example.com"
password = "AdminPass123!"

[server]
health_path = "/api/health"
command = "npm run dev"
"#,
        )
        .unwrap();
        assert_eq!(config.base_url(), "https://staging.example.com");
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.profile, ContractProfile::Lenient);
        assert_eq!(config.admin.unwrap().email, "admin@example.com");
        assert_eq!(config.server.command.as_deref(), Some("npm run dev"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PAVLO_BASE_URL", "http://10.0.0.5:8080"),
            ("PAVLO_TIMEOUT_SECS", "5"),
            ("PAVLO_PROFILE", "lenient"),
            ("PAVLO_ADMIN_EMAIL", "root@example.com"),
            ("PAVLO_OUTPUT_DIR", "   "),
        ]
        .into_iter()
        .collect();

        let mut config = RunnerConfig::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(config.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.profile, ContractProfile::Lenient);
        // password missing, so no admin
        assert!(config.admin.is_none());
        // blank values are ignored
        assert_eq!(config.output_dir, PathBuf::from("test-results"));
    }

    #[test_case("PAVLO_PROFILE", "lenent" ; "misspelled profile")]
    #[test_case("PAVLO_TIMEOUT_SECS", "thirty" ; "word timeout")]
    #[test_case("PAVLO_TIMEOUT_SECS", "-5" ; "negative timeout")]
    fn test_env_rejects_unparsable_values(key: &str, value: &str) {
        let mut config = RunnerConfig::default();
        let err = config
            .apply_env(|k| (k == key).then(|| value.to_string()))
            .unwrap_err();
        assert!(matches!(err, E2eError::Config(_)));
        assert!(err.to_string().contains(key), "{err}");
        assert_eq!(config.profile, ContractProfile::Canonical);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RunnerConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.base_url = "http://localhost:3000".to_string();
        config.timeout_secs = 0;
        assert!(config.validate().is_err());
    }
}

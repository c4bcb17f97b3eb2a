//! Error types for scenario runs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("{endpoint}: expected {expected}, got {status}: {body}")]
    UnexpectedStatus {
        endpoint: String,
        expected: String,
        status: u16,
        body: String,
    },

    #[error("Contract violation at {endpoint}: {source}")]
    Contract {
        endpoint: String,
        #[source]
        source: pavlo_contract::ContractError,
    },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("{method} {path} returned non-JSON ({status}): {snippet}")]
    NonJson {
        method: String,
        path: String,
        status: u16,
        snippet: String,
    },

    #[error("Unknown actor: {0}")]
    UnknownActor(String),

    #[error("Skipped: {0}")]
    Skipped(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    pub fn contract(endpoint: impl Into<String>, source: pavlo_contract::ContractError) -> Self {
        E2eError::Contract {
            endpoint: endpoint.into(),
            source,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, E2eError::Skipped(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

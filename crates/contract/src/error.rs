//! Error types for contract checks

use thiserror::Error;

/// Result type alias using ContractError
pub type Result<T> = std::result::Result<T, ContractError>;

/// A response body that does not satisfy the wire contract
#[derive(Error, Debug)]
pub enum ContractError {
    #[error("{what} has the wrong shape: {source}")]
    Shape {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{what}: field `{field}` {problem}")]
    Field {
        what: &'static str,
        field: String,
        problem: String,
    },

    #[error("malformed timestamp: {0:?}")]
    Timestamp(String),

    #[error("unknown contract profile: {0}")]
    UnknownProfile(String),
}

impl ContractError {
    pub fn field(what: &'static str, field: impl Into<String>, problem: impl Into<String>) -> Self {
        ContractError::Field {
            what,
            field: field.into(),
            problem: problem.into(),
        }
    }
}

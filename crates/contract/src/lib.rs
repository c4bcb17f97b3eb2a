//! Pavlo API Contract
//!
//! Typed wire bodies, the endpoint table, and shape validation for the
//! Pavlo HTTP API. Deserializing a response into one of these types is the
//! type check; [`Validate`] adds the semantic rules serde cannot express
//! (non-empty strings, timestamp format, token agreement).

pub mod endpoint;
pub mod error;
pub mod profile;
pub mod types;
pub mod validate;

pub use endpoint::Endpoint;
pub use error::{ContractError, Result};
pub use profile::ContractProfile;
pub use types::*;
pub use validate::{check_timestamp, decode, Validate};

/// Contract crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default base URL of the system under test
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

//! Contract profiles
//!
//! Deployed versions of the API disagree on a handful of response details
//! (register status code, token field name, history envelope, `/me`
//! envelope). A profile pins down which variants the suite accepts.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::endpoint::Endpoint;
use crate::error::ContractError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractProfile {
    /// One shape per endpoint: 201 on create, `accessToken`, wrapped
    /// `history` and `user` envelopes
    #[default]
    Canonical,
    /// Accept every variant seen in deployed servers
    Lenient,
}

impl ContractProfile {
    /// Status codes that count as success for an endpoint
    pub fn success_codes(&self, endpoint: Endpoint) -> &'static [u16] {
        match (self, endpoint) {
            (ContractProfile::Canonical, Endpoint::Register) => &[201],
            (ContractProfile::Canonical, Endpoint::AddSearch) => &[201],
            (ContractProfile::Canonical, Endpoint::Logout) => &[200],
            (ContractProfile::Lenient, Endpoint::Register) => &[200, 201],
            (ContractProfile::Lenient, Endpoint::AddSearch) => &[200, 201],
            (ContractProfile::Lenient, Endpoint::Logout) => &[200, 204],
            _ => &[200],
        }
    }

    pub fn is_lenient(&self) -> bool {
        matches!(self, ContractProfile::Lenient)
    }
}

impl FromStr for ContractProfile {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "canonical" | "strict" => Ok(ContractProfile::Canonical),
            "lenient" | "compat" => Ok(ContractProfile::Lenient),
            other => Err(ContractError::UnknownProfile(other.to_string())),
        }
    }
}

impl std::fmt::Display for ContractProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContractProfile::Canonical => write!(f, "canonical"),
            ContractProfile::Lenient => write!(f, "lenient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ContractProfile::Canonical, Endpoint::Register, &[201])]
    #[test_case(ContractProfile::Lenient, Endpoint::Register, &[200, 201])]
    #[test_case(ContractProfile::Canonical, Endpoint::Login, &[200])]
    #[test_case(ContractProfile::Lenient, Endpoint::Logout, &[200, 204])]
    #[test_case(ContractProfile::Canonical, Endpoint::AddSearch, &[201])]
    fn test_success_codes(profile: ContractProfile, endpoint: Endpoint, expected: &[u16]) {
        assert_eq!(profile.success_codes(endpoint), expected);
    }

    #[test]
    fn test_parse() {
        assert_eq!("Lenient".parse::<ContractProfile>().unwrap(), ContractProfile::Lenient);
        assert_eq!("strict".parse::<ContractProfile>().unwrap(), ContractProfile::Canonical);
        assert!("loose".parse::<ContractProfile>().is_err());
    }
}

//! Status and body expectations

use pavlo_contract::{decode, ErrorBody, Validate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::client::ApiResponse;
use crate::error::{E2eError, E2eResult};

/// What a step expects the server to answer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The endpoint's success codes under the active profile
    #[default]
    Success,
    /// 401 or 403
    Unauthorized,
    /// Exactly 401
    Unauthenticated,
    /// Any 4xx carrying an `error` or `message` field
    ClientError,
    /// Any status >= 400
    Rejected,
    /// One of these exact codes
    Status(Vec<u16>),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn accepts(&self, status: u16, success_codes: &[u16]) -> bool {
        match self {
            Outcome::Success => success_codes.contains(&status),
            Outcome::Unauthorized => status == 401 || status == 403,
            Outcome::Unauthenticated => status == 401,
            Outcome::ClientError => (400..500).contains(&status),
            Outcome::Rejected => status >= 400,
            Outcome::Status(codes) => codes.contains(&status),
        }
    }

    pub fn describe(&self, success_codes: &[u16]) -> String {
        let list = |codes: &[u16]| {
            codes
                .iter()
                .map(u16::to_string)
                .collect::<Vec<_>>()
                .join(" or ")
        };
        match self {
            Outcome::Success => list(success_codes),
            Outcome::Unauthorized => "401 or 403".to_string(),
            Outcome::Unauthenticated => "401".to_string(),
            Outcome::ClientError => "4xx with error/message".to_string(),
            Outcome::Rejected => ">= 400".to_string(),
            Outcome::Status(codes) => list(codes),
        }
    }
}

/// Fail unless `resp` matches `outcome`. Client errors must also carry a
/// reason in the body.
pub fn check_outcome(
    resp: &ApiResponse,
    outcome: &Outcome,
    success_codes: &[u16],
) -> E2eResult<()> {
    if !outcome.accepts(resp.status, success_codes) {
        return Err(E2eError::UnexpectedStatus {
            endpoint: resp.describe(),
            expected: outcome.describe(success_codes),
            status: resp.status,
            body: resp.snippet(),
        });
    }
    if *outcome == Outcome::ClientError {
        decode_body::<ErrorBody>(resp, "error body")?;
    }
    Ok(())
}

/// Decode and validate the response body as `T`
pub fn decode_body<T>(resp: &ApiResponse, what: &'static str) -> E2eResult<T>
where
    T: DeserializeOwned + Validate,
{
    decode(what, &resp.body).map_err(|e| E2eError::contract(resp.describe(), e))
}

/// Turn a false condition into an assertion failure
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pavlo_contract::endpoint::HttpMethod;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn resp(status: u16, body: Value) -> ApiResponse {
        ApiResponse {
            method: HttpMethod::Post,
            path: "/api/scrape".to_string(),
            status,
            body,
        }
    }

    #[test_case(Outcome::Success, 201, true)]
    #[test_case(Outcome::Success, 200, false)]
    #[test_case(Outcome::Unauthorized, 403, true)]
    #[test_case(Outcome::Unauthenticated, 403, false)]
    #[test_case(Outcome::ClientError, 500, false)]
    #[test_case(Outcome::Rejected, 500, true)]
    #[test_case(Outcome::Status(vec![204]), 204, true)]
    fn test_accepts(outcome: Outcome, status: u16, expected: bool) {
        assert_eq!(outcome.accepts(status, &[201]), expected);
    }

    #[test]
    fn test_client_error_requires_reason() {
        let ok = resp(400, json!({"error": "Invalid URL format"}));
        assert!(check_outcome(&ok, &Outcome::ClientError, &[200]).is_ok());

        let bare = resp(400, json!({"details": []}));
        let err = check_outcome(&bare, &Outcome::ClientError, &[200]).unwrap_err();
        assert!(matches!(err, E2eError::Contract { .. }));
    }

    #[test]
    fn test_unexpected_status_message() {
        let r = resp(200, json!({"success": true}));
        let err = check_outcome(&r, &Outcome::Unauthorized, &[200]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("POST /api/scrape"));
        assert!(msg.contains("401 or 403"));
        assert!(msg.contains("got 200"));
    }

    #[test]
    fn test_outcome_yaml_forms() {
        let unit: Outcome = serde_yaml::from_str("unauthorized").unwrap();
        assert_eq!(unit, Outcome::Unauthorized);
        let codes: Outcome = serde_yaml::from_str("status: [200, 204]").unwrap();
        assert_eq!(codes, Outcome::Status(vec![200, 204]));
    }
}

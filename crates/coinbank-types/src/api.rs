use serde::{Deserialize, Serialize};

use crate::models::Account;

// -- Token claims --

/// Claim set carried by account bearer tokens. The field names are part of
/// the wire format: `{ "expiresAt": <unix seconds>, "accountNumber": <number> }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub expires_at: i64,
    pub account_number: i64,
}

// -- Accounts --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    pub first_name: String,
    pub last_name: String,
}

/// The created account plus the bearer token minted for it.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateAccountResponse {
    #[serde(flatten)]
    pub account: Account,
    pub token: String,
}

// -- Transfers --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_account: i64,
    pub amount: i64,
}

// -- Errors --

/// JSON error body: `{"Error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(rename = "Error")]
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claims_wire_shape() {
        let claims = Claims {
            expires_at: 1_700_000_000,
            account_number: 42,
        };
        let json = serde_json::to_string(&claims).unwrap();
        assert_eq!(json, r#"{"expiresAt":1700000000,"accountNumber":42}"#);
    }

    #[test]
    fn api_error_uses_capitalized_key() {
        let json = serde_json::to_string(&ApiError::new("invalid token")).unwrap();
        assert_eq!(json, r#"{"Error":"invalid token"}"#);
    }
}

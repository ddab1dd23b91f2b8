use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use coinbank_types::api::{Claims, CreateAccountRequest, CreateAccountResponse, TransferRequest};
use coinbank_types::models::Account;

use crate::auth::AppState;
use crate::error::{HttpError, blocking};

/// GET /account
pub async fn list_accounts(State(state): State<AppState>) -> Result<Json<Vec<Account>>, HttpError> {
    let accounts = state.accounts.clone();
    let all = blocking(move || accounts.list_accounts()).await?;
    Ok(Json(all))
}

/// POST /account: creates the account and mints its bearer token.
pub async fn create_account(
    State(state): State<AppState>,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<Json<CreateAccountResponse>, HttpError> {
    let Json(req) = payload.map_err(|e| HttpError::bad_request(e.body_text()))?;

    let first_name = req.first_name.trim().to_string();
    let last_name = req.last_name.trim().to_string();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(HttpError::bad_request("first and last name are required"));
    }

    let accounts = state.accounts.clone();
    let account = blocking(move || accounts.create_account(&first_name, &last_name)).await?;
    let token = state.tokens.mint(&account)?;

    info!("Created account {} with number {}", account.id, account.number);
    Ok(Json(CreateAccountResponse { account, token }))
}

/// GET /account/{id}, gated. 404 with a `null` body when absent.
pub async fn get_account(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Response, HttpError> {
    let id = parse_id(&raw_id)?;

    let accounts = state.accounts.clone();
    let Some(account) = blocking(move || accounts.get_account(id)).await? else {
        return Ok((StatusCode::NOT_FOUND, Json(serde_json::Value::Null)).into_response());
    };

    ensure_owner(&state, &claims, &account)?;
    Ok(Json(account).into_response())
}

/// DELETE /account/{id}, gated. Answers 200 `null` whether or not the
/// account existed.
pub async fn delete_account(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let id = parse_id(&raw_id)?;

    if state.enforce_account_match {
        let accounts = state.accounts.clone();
        if let Some(account) = blocking(move || accounts.get_account(id)).await? {
            ensure_owner(&state, &claims, &account)?;
        }
    }

    let accounts = state.accounts.clone();
    if blocking(move || accounts.delete_account(id)).await? {
        info!("Deleted account {}", id);
    }
    Ok(Json(serde_json::Value::Null))
}

/// POST /transfer: the request is validated and acknowledged; balances
/// are not moved.
pub async fn transfer(
    payload: Result<Json<TransferRequest>, JsonRejection>,
) -> Result<StatusCode, HttpError> {
    let Json(req) = payload.map_err(|e| HttpError::bad_request(e.body_text()))?;
    info!(
        "Transfer of {} to account {} acknowledged without processing",
        req.amount, req.to_account
    );
    Ok(StatusCode::OK)
}

fn parse_id(raw: &str) -> Result<i64, HttpError> {
    raw.parse()
        .map_err(|_| HttpError::bad_request(format!("invalid id given: {}", raw)))
}

fn ensure_owner(state: &AppState, claims: &Claims, account: &Account) -> Result<(), HttpError> {
    if state.enforce_account_match && claims.account_number != account.number {
        warn!(
            "Token for account number {} used against account {}",
            claims.account_number, account.id
        );
        return Err(HttpError::forbidden("permission denied"));
    }
    Ok(())
}

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::HttpError;
use crate::token::TokenService;

/// Request header carrying the account bearer token.
pub const TOKEN_HEADER: &str = "x-jwt-token";

/// Extract and verify the token from the `x-jwt-token` header.
///
/// Any failure answers 403 `{"Error":"invalid token"}` without running the
/// wrapped handler. On success the verified [`Claims`] are stored in the
/// request extensions. The gate only authenticates: it does not compare the
/// claimed account number with the account a route addresses.
///
/// [`Claims`]: coinbank_types::api::Claims
pub async fn require_token(
    State(tokens): State<TokenService>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = req
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            debug!("Rejected {}: no {} header", req.uri().path(), TOKEN_HEADER);
            HttpError::invalid_token()
        })?;

    let claims = tokens.verify(token).map_err(|e| {
        debug!("Rejected {}: {}", req.uri().path(), e);
        HttpError::invalid_token()
    })?;

    debug!("Verified token for account number {}", claims.account_number);
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::{
        Extension, Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        middleware,
        routing::get,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    use coinbank_types::api::Claims;
    use coinbank_types::models::Account;

    use super::*;

    fn tokens() -> TokenService {
        TokenService::new("gate-secret", Duration::minutes(10))
    }

    fn gated_app(calls: Arc<AtomicUsize>) -> Router {
        Router::new()
            .route(
                "/protected",
                get(move |Extension(claims): Extension<Claims>| {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        claims.account_number.to_string()
                    }
                }),
            )
            .layer(middleware::from_fn_with_state(tokens(), require_token))
    }

    fn token_for(number: i64) -> String {
        tokens()
            .mint(&Account {
                id: 1,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                number,
                balance: 0,
                created_at: Utc::now(),
            })
            .unwrap()
    }

    async fn call(app: Router, token: Option<&str>) -> (StatusCode, String) {
        let mut req = Request::builder().uri("/protected");
        if let Some(token) = token {
            req = req.header(TOKEN_HEADER, token);
        }
        let resp = app.oneshot(req.body(Body::empty()).unwrap()).await.unwrap();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn valid_token_reaches_handler_with_claims() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (status, body) = call(gated_app(calls.clone()), Some(&token_for(555_000_111))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "555000111");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_header_is_forbidden() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (status, body) = call(gated_app(calls.clone()), None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body, r#"{"Error":"invalid token"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn bad_tokens_are_forbidden_alike() {
        let expired = jsonwebtoken::encode(
            &jsonwebtoken::Header::default(),
            &Claims {
                expires_at: Utc::now().timestamp() - 1,
                account_number: 1,
            },
            &jsonwebtoken::EncodingKey::from_secret(b"gate-secret"),
        )
        .unwrap();
        let foreign = TokenService::new("other-secret", Duration::minutes(10))
            .mint(&Account {
                id: 1,
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                number: 1,
                balance: 0,
                created_at: Utc::now(),
            })
            .unwrap();

        let calls = Arc::new(AtomicUsize::new(0));
        for token in ["garbage", expired.as_str(), foreign.as_str()] {
            let (status, body) = call(gated_app(calls.clone()), Some(token)).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body, r#"{"Error":"invalid token"}"#);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode},
};
use reqwest::Url;
use tower::ServiceExt;

use coinbank_api::auth::{AppState, AppStateInner};
use coinbank_api::oauth::{
    DISCORD_AUTHORIZE_URL, DISCORD_IDENTIFY_SCOPE, DISCORD_PROFILE_URL, DISCORD_TOKEN_URL,
    IdentityProvider, OAuthError, OAuthFlow, OAuthSettings,
};
use coinbank_api::token::TokenService;
use coinbank_db::Database;

pub const JWT_SECRET: &str = "integration-test-secret";

pub const PROFILE: &str = r#"{"id":"485103041738047489","username":"ada","global_name":"Ada Lovelace","avatar":"13a45106234fa19fd7b22795df2b6833"}"#;

/// Provider double that records how often it is called.
pub struct FakeProvider {
    pub calls: AtomicUsize,
    pub fail_exchange: bool,
}

impl FakeProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn exchange_code(&self, _code: &str) -> Result<String, OAuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_exchange {
            return Err(OAuthError::Exchange("token endpoint returned 400 Bad Request".into()));
        }
        Ok("access-token".into())
    }

    async fn fetch_profile(&self, _access_token: &str) -> Result<Vec<u8>, OAuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(PROFILE.as_bytes().to_vec())
    }
}

pub struct TestApp {
    pub app: Router,
    pub db: Arc<Database>,
    pub provider: Arc<FakeProvider>,
    pub tokens: TokenService,
}

#[derive(Default)]
pub struct Options {
    pub enforce_account_match: bool,
    pub fail_exchange: bool,
}

pub fn settings() -> OAuthSettings {
    OAuthSettings {
        client_id: "client-123".into(),
        client_secret: "client-secret".into(),
        redirect_url: "http://localhost:3000/auth/callback".into(),
        authorize_url: Url::parse(DISCORD_AUTHORIZE_URL).unwrap(),
        token_url: Url::parse(DISCORD_TOKEN_URL).unwrap(),
        profile_url: Url::parse(DISCORD_PROFILE_URL).unwrap(),
        scope: DISCORD_IDENTIFY_SCOPE.into(),
        timeout: Duration::from_secs(5),
        state_ttl: chrono::Duration::minutes(10),
    }
}

pub fn spawn_app(options: Options) -> TestApp {
    let db = Arc::new(Database::open_in_memory().unwrap());
    let provider = Arc::new(FakeProvider {
        calls: AtomicUsize::new(0),
        fail_exchange: options.fail_exchange,
    });
    let tokens = TokenService::new(JWT_SECRET, chrono::Duration::seconds(15_000));

    let state: AppState = Arc::new(AppStateInner {
        accounts: db.clone(),
        tokens: tokens.clone(),
        oauth: OAuthFlow::new(settings(), provider.clone(), db.clone()),
        enforce_account_match: options.enforce_account_match,
    });

    TestApp {
        app: coinbank_api::router(state),
        db,
        provider,
        tokens,
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> TestResponse {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(body.to_vec()).unwrap(),
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut req = Request::builder().uri(uri);
        if let Some(token) = token {
            req = req.header("x-jwt-token", token);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        let mut req = Request::builder().method("DELETE").uri(uri);
        if let Some(token) = token {
            req = req.header("x-jwt-token", token);
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post_json(&self, uri: &str, body: &str) -> TestResponse {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }
}

//! Linking external identities through an OAuth authorization-code login.
//!
//! A login moves through three stages:
//!
//! 1. **Initiated**: [`OAuthFlow::begin_login`] issues a random single-use
//!    `state`, records it server-side and returns the provider URL. The
//!    caller also stores the state in a browser cookie.
//! 2. **Exchanged**: [`OAuthFlow::handle_callback`] checks the echoed
//!    state against the cookie and the server-side record, then trades the
//!    authorization code for a provider access token.
//! 3. **Linked**: the provider profile is fetched, decoded and stored as
//!    an [`ExternalIdentity`] unless one with that id already exists.
//!
//! No provider call happens before the state check passes, and the identity
//! insert is the last step, so a failed callback leaves nothing behind.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, Utc};
use rand::Rng;
use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, warn};

use coinbank_db::{IdentityStore, StoreError};
use coinbank_types::models::ExternalIdentity;

use crate::error::blocking;

/// Cookie binding a login attempt to the browser that started it.
pub const STATE_COOKIE: &str = "oauth_state";

pub const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";
pub const DISCORD_TOKEN_URL: &str = "https://discord.com/api/oauth2/token";
pub const DISCORD_PROFILE_URL: &str = "https://discord.com/api/users/@me";
/// Read access to the basic user profile, nothing else.
pub const DISCORD_IDENTIFY_SCOPE: &str = "identify";

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("State does not match.")]
    StateMismatch,
    #[error("code exchange failed: {0}")]
    Exchange(String),
    #[error("profile fetch failed: {0}")]
    ProfileFetch(String),
    #[error("malformed profile payload: {0}")]
    Decode(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Callback failures are answered in plain text: 400 for a bad state,
/// 500 with the underlying message for everything else.
impl IntoResponse for OAuthError {
    fn into_response(self) -> Response {
        let status = match &self {
            OAuthError::StateMismatch => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Client credentials and provider endpoints, fixed at startup.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub profile_url: Url,
    pub scope: String,
    /// Per-request timeout for provider calls.
    pub timeout: Duration,
    /// How long an issued login state can be redeemed.
    pub state_ttl: chrono::Duration,
}

/// The two network calls made against the identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Redeem an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError>;

    /// Fetch the raw profile document of the token's owner.
    async fn fetch_profile(&self, access_token: &str) -> Result<Vec<u8>, OAuthError>;
}

/// [`IdentityProvider`] speaking OAuth2 over HTTPS.
pub struct HttpIdentityProvider {
    http: reqwest::Client,
    settings: OAuthSettings,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl HttpIdentityProvider {
    pub fn new(settings: OAuthSettings) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn exchange_code(&self, code: &str) -> Result<String, OAuthError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        let resp = self
            .http
            .post(self.settings.token_url.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| OAuthError::Exchange(describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Token endpoint answered {}: {}", status, body);
            return Err(OAuthError::Exchange(format!("token endpoint returned {}", status)));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OAuthError::Exchange(describe(&e)))?;
        Ok(token.access_token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<Vec<u8>, OAuthError> {
        let resp = self
            .http
            .get(self.settings.profile_url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::ProfileFetch(describe(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(OAuthError::ProfileFetch(status.to_string()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| OAuthError::ProfileFetch(describe(&e)))?;
        Ok(body.to_vec())
    }
}

fn describe(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("request timed out: {}", err)
    } else {
        err.to_string()
    }
}

/// Profile document returned by the provider's `users/@me` endpoint.
#[derive(Debug, Deserialize)]
pub struct ProviderProfile {
    pub id: String,
    pub username: String,
    pub global_name: Option<String>,
    pub avatar: Option<String>,
}

impl ProviderProfile {
    pub fn into_identity(self, seen_at: DateTime<Utc>) -> ExternalIdentity {
        let display_name = self
            .global_name
            .filter(|name| !name.is_empty())
            .unwrap_or(self.username);
        ExternalIdentity {
            id: self.id,
            display_name,
            avatar: self.avatar,
            last_seen: seen_at,
        }
    }
}

/// Query parameters the provider appends to the redirect URI.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug)]
pub struct LoginRedirect {
    pub url: Url,
    pub state: String,
}

#[derive(Debug)]
pub struct LinkOutcome {
    pub identity: ExternalIdentity,
    /// False when the identity was already linked, including when a
    /// concurrent callback inserted it first.
    pub created: bool,
}

#[derive(Clone)]
pub struct OAuthFlow {
    settings: Arc<OAuthSettings>,
    provider: Arc<dyn IdentityProvider>,
    store: Arc<dyn IdentityStore>,
}

impl OAuthFlow {
    pub fn new(
        settings: OAuthSettings,
        provider: Arc<dyn IdentityProvider>,
        store: Arc<dyn IdentityStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            provider,
            store,
        }
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Issue a fresh login state and the provider URL embedding it.
    pub async fn begin_login(&self) -> Result<LoginRedirect, OAuthError> {
        let state = generate_state();
        let now = Utc::now().timestamp();
        let expire_before = now - self.settings.state_ttl.num_seconds();

        let store = self.store.clone();
        let saved = state.clone();
        blocking(move || store.save_login_state(&saved, now, expire_before)).await?;

        Ok(LoginRedirect {
            url: self.authorization_url(&state),
            state,
        })
    }

    pub fn authorization_url(&self, state: &str) -> Url {
        let mut url = self.settings.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &self.settings.scope)
            .append_pair("state", state);
        url
    }

    /// Complete a login: verify state, exchange the code, fetch and decode
    /// the profile, then link the identity if it is new.
    ///
    /// `cookie_state` is the value of the [`STATE_COOKIE`] cookie sent by
    /// the browser, if any.
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
        cookie_state: Option<&str>,
    ) -> Result<LinkOutcome, OAuthError> {
        self.check_state(params.state.as_deref(), cookie_state).await?;

        if let Some(reason) = &params.error {
            warn!("Provider refused authorization: {}", reason);
            return Err(OAuthError::Exchange(format!("authorization denied: {}", reason)));
        }
        let code = params
            .code
            .as_deref()
            .filter(|code| !code.is_empty())
            .ok_or_else(|| OAuthError::Exchange("missing authorization code".into()))?;

        let access_token = self.provider.exchange_code(code).await.inspect_err(|e| {
            error!("OAuth code exchange failed: {}", e);
        })?;

        let payload = self.provider.fetch_profile(&access_token).await.inspect_err(|e| {
            error!("OAuth profile fetch failed: {}", e);
        })?;

        let profile: ProviderProfile =
            serde_json::from_slice(&payload).map_err(|e| OAuthError::Decode(e.to_string()))?;

        self.link(profile.into_identity(Utc::now())).await
    }

    async fn check_state(&self, returned: Option<&str>, expected: Option<&str>) -> Result<(), OAuthError> {
        let (Some(returned), Some(expected)) = (returned, expected) else {
            warn!("OAuth callback without state or state cookie");
            return Err(OAuthError::StateMismatch);
        };
        if returned != expected {
            warn!("OAuth callback state does not match cookie");
            return Err(OAuthError::StateMismatch);
        }

        let not_before = Utc::now().timestamp() - self.settings.state_ttl.num_seconds();
        let store = self.store.clone();
        let state = returned.to_string();
        let redeemed = blocking(move || store.consume_login_state(&state, not_before)).await?;
        if !redeemed {
            warn!("OAuth callback state is unknown, expired or already used");
            return Err(OAuthError::StateMismatch);
        }
        Ok(())
    }

    /// Check-then-insert. Two callbacks for the same new identity can both
    /// see it as absent; the loser's insert hits the primary key and is
    /// treated as already linked.
    async fn link(&self, identity: ExternalIdentity) -> Result<LinkOutcome, OAuthError> {
        let store = self.store.clone();
        let candidate = identity.clone();
        let created = blocking(move || {
            if store.external_identity_exists(&candidate.id)? {
                return Ok(false);
            }
            match store.create_external_identity(&candidate) {
                Ok(()) => Ok(true),
                Err(StoreError::Duplicate) => {
                    warn!("External identity {} was linked concurrently, keeping existing record", candidate.id);
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
        .await?;

        if created {
            info!("Linked new external identity {} ({})", identity.id, identity.display_name);
        }
        Ok(LinkOutcome { identity, created })
    }
}

fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    B64.encode(bytes)
}

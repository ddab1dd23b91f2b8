use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::info;

use coinbank_db::AccountDirectory;

use crate::oauth::{CallbackParams, OAuthError, OAuthFlow, STATE_COOKIE};
use crate::token::TokenService;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub accounts: Arc<dyn AccountDirectory>,
    pub tokens: TokenService,
    pub oauth: OAuthFlow,
    /// Require the token's account number to match the addressed account.
    /// Off by default: any valid token may read or delete any account.
    pub enforce_account_match: bool,
}

/// GET /login: 307 to the provider's authorization page with a fresh
/// state, mirrored into the state cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect), OAuthError> {
    let login = state.oauth.begin_login().await?;
    let secure = state.oauth.settings().redirect_url.starts_with("https://");

    let cookie = Cookie::build((STATE_COOKIE, login.state))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .build();

    Ok((jar.add(cookie), Redirect::temporary(login.url.as_str())))
}

/// GET /auth/callback: the provider sends the browser back here.
/// The state cookie is cleared whatever the outcome.
pub async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    let cookie_state = jar.get(STATE_COOKIE).map(|c| c.value().to_string());
    let jar = jar.remove(Cookie::build(STATE_COOKIE).path("/"));

    match state.oauth.handle_callback(&params, cookie_state.as_deref()).await {
        Ok(outcome) => {
            info!(
                "OAuth login completed for {} (new link: {}, avatar: {})",
                outcome.identity.id,
                outcome.created,
                outcome.identity.avatar_url().as_deref().unwrap_or("none")
            );
            (jar, format!("Logged in as {}", outcome.identity.display_name)).into_response()
        }
        Err(e) => (jar, e).into_response(),
    }
}

use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::accounts;
use crate::auth::{self, AppState};
use crate::middleware::require_token;

/// All API routes. Static file serving, CORS and tracing layers are added
/// by the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/account", get(accounts::list_accounts).post(accounts::create_account))
        .route("/transfer", post(accounts::transfer))
        .route("/login", get(auth::login))
        .route("/auth/callback", get(auth::callback))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route(
            "/account/{id}",
            get(accounts::get_account).delete(accounts::delete_account),
        )
        .layer(middleware::from_fn_with_state(state.tokens.clone(), require_token))
        .with_state(state);

    Router::new().merge(public_routes).merge(protected_routes)
}

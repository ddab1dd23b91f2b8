//! HTTP API: account endpoints behind the token gate, bearer token
//! issuance, and OAuth linking of external identities.

pub mod accounts;
pub mod auth;
pub mod error;
pub mod middleware;
pub mod oauth;
pub mod routes;
pub mod token;

pub use routes::router;

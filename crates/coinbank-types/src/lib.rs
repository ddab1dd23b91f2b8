//! Wire and domain types shared by the coinbank crates.

pub mod api;
pub mod models;

//! Wicket - single-use download tokens for purchased reports
//!
//! A buyer who owns a purchase can ask for a download token. The token is a
//! signed, time-limited bearer string that unlocks the purchased report
//! exactly once.
//!
//! ## Components
//!
//! - **Issuer**: checks purchase ownership and mints a token record plus a
//!   signed bearer token
//! - **Redeemer**: verifies a presented token and consumes its record with a
//!   per-record compare-and-set
//! - **Store**: token records in memory or MongoDB
//! - **Catalog**: purchases and artifacts, owned by the storefront

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod logging;
pub mod routes;
pub mod server;
pub mod store;
pub mod tokens;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use tokens::{TokenIssuer, TokenRedeemer, TokenService};
pub use types::{Result, WicketError};

//! Status endpoint for Wicket
//!
//! Reports configuration and token record counts.

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{error_response, json_response};
use crate::server::AppState;

/// Status response payload
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub node_id: String,
    pub dev_mode: bool,
    /// Token record store backend
    pub store: &'static str,
    pub token_validity_hours: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_purchase: Option<u32>,
    pub total_tokens: u64,
    pub consumed_tokens: u64,
    /// Audit events since start
    pub audit_events: u64,
}

/// Handle status request
pub async fn status_check(state: &AppState) -> Response<Full<Bytes>> {
    let stats = match state.store.stats().await {
        Ok(stats) => stats,
        Err(e) => return error_response(&e),
    };
    let policy = state.tokens.issuer().policy();

    let status = StatusResponse {
        service: "wicket",
        version: env!("CARGO_PKG_VERSION"),
        node_id: state.args.node_id.to_string(),
        dev_mode: state.args.dev_mode,
        store: state.store.backend(),
        token_validity_hours: policy.validity.num_hours(),
        max_tokens_per_purchase: policy.max_tokens_per_purchase,
        total_tokens: stats.total_records,
        consumed_tokens: stats.consumed_records,
        audit_events: state.tokens.audit().event_count().await,
    };

    json_response(StatusCode::OK, &status)
}

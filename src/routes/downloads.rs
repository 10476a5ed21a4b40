//! Download token routes
//!
//! - POST /api/download-tokens - issue a token for a purchase
//! - GET  /api/download/:token - redeem a token for its report

use bytes::Bytes;
use chrono::{DateTime, Utc};
use http_body_util::Full;
use hyper::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use tracing::{error, info};
use uuid::Uuid;

use super::{error_response, json_response};
use crate::auth::fingerprint;
use crate::catalog::ArtifactRef;
use crate::server::AppState;
use crate::types::{Result, WicketError};

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 10 * 1024;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    pub download_url: String,
    pub token: String,
    pub token_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Redemption result. Storage location stays server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadResponse {
    pub artifact_id: String,
    pub title: String,
}

impl From<ArtifactRef> for DownloadResponse {
    fn from(artifact: ArtifactRef) -> Self {
        Self {
            artifact_id: artifact.artifact_id,
            title: artifact.title,
        }
    }
}

fn parse_issue_request(body: &[u8]) -> Result<IssueRequest> {
    if body.len() > MAX_BODY_BYTES {
        return Err(WicketError::InvalidRequest("Request body too large".into()));
    }
    serde_json::from_slice(body).map_err(WicketError::from)
}

/// POST /api/download-tokens
pub async fn handle_issue(state: &AppState, body: &[u8]) -> Response<Full<Bytes>> {
    let request = match parse_issue_request(body) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    let issued = match state
        .tokens
        .issue(&request.order_id, &request.user_id)
        .await
    {
        Ok(issued) => issued,
        Err(e) => {
            if !e.is_rejection() {
                error!("Error generating download token: {}", e);
            }
            return error_response(&e);
        }
    };

    json_response(
        StatusCode::OK,
        &IssueResponse {
            download_url: state.tokens.download_url(&issued.token),
            token: issued.token,
            token_id: issued.token_id,
            expires_at: issued.expires_at,
        },
    )
}

/// GET /api/download/:token
pub async fn handle_download(
    state: &AppState,
    token: &str,
    origin: Option<IpAddr>,
) -> Response<Full<Bytes>> {
    info!(
        token = %fingerprint(token),
        origin = ?origin,
        "Download attempt"
    );

    match state.tokens.redeem(token, origin).await {
        Ok(artifact) => json_response(StatusCode::OK, &DownloadResponse::from(artifact)),
        Err(e) => {
            if !e.is_rejection() {
                error!("Error redeeming download token: {}", e);
            }
            error_response(&e)
        }
    }
}

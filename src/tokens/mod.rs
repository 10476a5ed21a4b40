//! Download token lifecycle
//!
//! [`TokenIssuer`] mints tokens for purchases, [`TokenRedeemer`] consumes
//! them. [`TokenService`] pairs the two for the HTTP layer and records every
//! attempt in the audit trail, timed-out attempts included.

pub mod clock;
pub mod issuer;
pub mod record;
pub mod redeemer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use issuer::{IssuancePolicy, IssuedToken, TokenIssuer, DEFAULT_VALIDITY_HOURS};
pub use record::{Consumption, TokenRecord};
pub use redeemer::{Redemption, TokenRedeemer};

use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;

use crate::auth::fingerprint;
use crate::catalog::ArtifactRef;
use crate::logging::{AuditLogger, EventType};
use crate::types::{Result, WicketError};

/// Issuer and redeemer as one service, constructed once per process
pub struct TokenService {
    issuer: TokenIssuer,
    redeemer: TokenRedeemer,
    audit: AuditLogger,
    base_url: String,
    request_timeout: Option<Duration>,
}

impl TokenService {
    pub fn new(
        issuer: TokenIssuer,
        redeemer: TokenRedeemer,
        audit: AuditLogger,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            issuer,
            redeemer,
            audit,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout: None,
        }
    }

    /// Bound each issue and redeem call. The audit record of a call is
    /// written after the bound, so a timed-out call is still audited.
    pub fn with_request_timeout(mut self, limit: Duration) -> Self {
        self.request_timeout = Some(limit);
        self
    }

    async fn bounded<T>(&self, operation: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let Some(limit) = self.request_timeout else {
            return fut.await;
        };
        tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WicketError::Timeout(format!("{} exceeded {:?}", operation, limit)))?
    }

    /// Issue a token for `purchase_id` on behalf of `buyer_id`
    pub async fn issue(&self, purchase_id: &str, buyer_id: &str) -> Result<IssuedToken> {
        let result = self
            .bounded("issue", self.issuer.issue(purchase_id, buyer_id))
            .await;

        let event = match &result {
            Ok(issued) => self
                .audit
                .event(EventType::TokenIssued)
                .with_token(fingerprint(&issued.token))
                .with_token_id(issued.token_id),
            Err(e) => self
                .audit
                .event(EventType::IssueRejected)
                .with_reason(e.code()),
        };
        self.audit
            .log(event.with_purchase(purchase_id, buyer_id))
            .await;

        result
    }

    /// Redeem a bearer token, returning the report it unlocks
    pub async fn redeem(&self, bearer: &str, origin: Option<IpAddr>) -> Result<ArtifactRef> {
        let result = self
            .bounded("redeem", self.redeemer.redeem(bearer, origin))
            .await;

        let event = match &result {
            Ok(redemption) => self
                .audit
                .event(EventType::DownloadRedeemed)
                .with_token_id(redemption.record.id)
                .with_purchase(&redemption.record.purchase_id, &redemption.record.buyer_id)
                .with_artifact(&redemption.artifact.artifact_id),
            Err(e) => self
                .audit
                .event(EventType::DownloadRejected)
                .with_reason(e.code()),
        };
        self.audit
            .log(
                event
                    .with_token(fingerprint(bearer))
                    .with_origin(origin),
            )
            .await;

        result.map(|redemption| redemption.artifact)
    }

    /// Public URL at which `token` can be redeemed
    pub fn download_url(&self, token: &str) -> String {
        format!("{}/api/download/{}", self.base_url, token)
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }
}

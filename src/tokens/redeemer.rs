//! Token redemption
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. signature and shape (no store access)
//! 2. `exp` claim (no store access)
//! 3. record lookup and claim binding
//! 4. record expiry
//! 5. prior consumption
//! 6. compare-and-set consume
//! 7. artifact resolution; the token stays burned if this fails
//!
//! The clock is read once and that instant is used for both expiry checks
//! and as the consumption time.

use chrono::{DateTime, Utc};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{Clock, TokenRecord};
use crate::auth::{fingerprint, DownloadClaims, TokenSigner};
use crate::catalog::{ArtifactRef, ArtifactResolver};
use crate::store::{ConsumeOutcome, TokenStore};
use crate::types::{Result, WicketError};

/// A completed redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    /// The record after consumption
    pub record: TokenRecord,
    pub artifact: ArtifactRef,
}

pub struct TokenRedeemer {
    store: Arc<dyn TokenStore>,
    artifacts: Arc<dyn ArtifactResolver>,
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
}

/// The one message for every missing or unbindable token
fn unknown_token() -> WicketError {
    WicketError::NotFound("download token".into())
}

impl TokenRedeemer {
    pub fn new(
        store: Arc<dyn TokenStore>,
        artifacts: Arc<dyn ArtifactResolver>,
        signer: Arc<TokenSigner>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            artifacts,
            signer,
            clock,
        }
    }

    /// Redeem a bearer token, consuming it
    pub async fn redeem(&self, bearer: &str, origin: Option<IpAddr>) -> Result<Redemption> {
        let now = self.clock.now();
        let fp = fingerprint(bearer);

        let claims = self.signer.verify(bearer).map_err(|e| {
            debug!(token = %fp, error = %e, "Rejected bearer token");
            e
        })?;

        if claim_expired(&claims, now) {
            debug!(token = %fp, exp = claims.exp, "Token claim expired");
            return Err(WicketError::Expired);
        }

        let record = self
            .store
            .get(&claims.token_id)
            .await?
            .ok_or_else(unknown_token)?;

        if !binds(&claims, &record) {
            warn!(token = %fp, token_id = %record.id, "Token claims do not match record");
            return Err(unknown_token());
        }

        if record.is_expired_at(now) {
            debug!(token = %fp, token_id = %record.id, "Token record expired");
            return Err(WicketError::Expired);
        }

        if record.is_consumed() {
            return Err(WicketError::AlreadyUsed);
        }

        let record = match self.store.consume(&record.id, now, origin).await? {
            ConsumeOutcome::Consumed(record) => record,
            ConsumeOutcome::AlreadyConsumed => {
                info!(token = %fp, token_id = %record.id, "Lost redemption race");
                return Err(WicketError::AlreadyUsed);
            }
            ConsumeOutcome::Missing => return Err(unknown_token()),
        };

        info!(
            token = %fp,
            token_id = %record.id,
            purchase_id = %record.purchase_id,
            origin = ?origin,
            "Download token consumed"
        );

        let artifact = self
            .artifacts
            .resolve_artifact(&record.artifact_id)
            .await?
            .ok_or_else(|| {
                warn!(
                    token_id = %record.id,
                    artifact_id = %record.artifact_id,
                    "Artifact missing after consumption"
                );
                WicketError::NotFound("report".into())
            })?;

        Ok(Redemption { record, artifact })
    }
}

fn claim_expired(claims: &DownloadClaims, now: DateTime<Utc>) -> bool {
    now.timestamp() >= claims.exp
}

/// The token must describe exactly the record it points at
fn binds(claims: &DownloadClaims, record: &TokenRecord) -> bool {
    claims.buyer_id == record.buyer_id
        && claims.purchase_id == record.purchase_id
        && claims.artifact_id == record.artifact_id
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Purchase;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn record() -> TokenRecord {
        let purchase = Purchase {
            id: "p1".into(),
            buyer_id: "u1".into(),
            artifact_id: "a1".into(),
            purchased_at: Utc::now(),
        };
        TokenRecord::new(&purchase, Utc::now(), Duration::hours(1)).unwrap()
    }

    fn claims_for(record: &TokenRecord) -> DownloadClaims {
        DownloadClaims {
            token_id: record.id,
            buyer_id: record.buyer_id.clone(),
            artifact_id: record.artifact_id.clone(),
            purchase_id: record.purchase_id.clone(),
            iat: record.created_at.timestamp(),
            exp: record.expires_at.timestamp(),
        }
    }

    #[test]
    fn test_claim_expires_at_exp() {
        let exp = Utc.with_ymd_and_hms(2025, 5, 8, 9, 30, 0).unwrap();
        let mut claims = claims_for(&record());
        claims.exp = exp.timestamp();

        assert!(!claim_expired(&claims, exp - Duration::seconds(1)));
        assert!(claim_expired(&claims, exp));
    }

    #[test]
    fn test_binding_checks_every_field() {
        let record = record();
        assert!(binds(&claims_for(&record), &record));

        let mut other_buyer = claims_for(&record);
        other_buyer.buyer_id = "u2".into();
        assert!(!binds(&other_buyer, &record));

        let mut other_artifact = claims_for(&record);
        other_artifact.artifact_id = "a2".into();
        assert!(!binds(&other_artifact, &record));

        let mut other_purchase = claims_for(&record);
        other_purchase.purchase_id = "p2".into();
        assert!(!binds(&other_purchase, &record));

        // The id is matched by lookup, not by binding
        let mut other_id = claims_for(&record);
        other_id.token_id = Uuid::new_v4();
        assert!(binds(&other_id, &record));
    }
}

//! Token issuance
//!
//! Mints one record and one bearer token per successful call. Ownership is
//! checked against the purchase; a mismatched buyer is rejected, never
//! silently replaced by the real owner.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::{Clock, TokenRecord};
use crate::auth::{DownloadClaims, TokenSigner};
use crate::catalog::PurchaseLookup;
use crate::store::TokenStore;
use crate::types::{Result, WicketError};

/// Default validity window of a download token
pub const DEFAULT_VALIDITY_HOURS: i64 = 24;

/// Issuance settings
#[derive(Debug, Clone)]
pub struct IssuancePolicy {
    /// How long a token stays redeemable
    pub validity: Duration,
    /// Cap on records per purchase. `None` allows unlimited reissuance.
    pub max_tokens_per_purchase: Option<u32>,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            validity: Duration::hours(DEFAULT_VALIDITY_HOURS),
            max_tokens_per_purchase: None,
        }
    }
}

/// A freshly minted token
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    /// Signed bearer string
    pub token: String,
    pub token_id: Uuid,
    pub purchase_id: String,
    pub buyer_id: String,
    pub expires_at: DateTime<Utc>,
}

pub struct TokenIssuer {
    purchases: Arc<dyn PurchaseLookup>,
    store: Arc<dyn TokenStore>,
    signer: Arc<TokenSigner>,
    clock: Arc<dyn Clock>,
    policy: IssuancePolicy,
}

impl TokenIssuer {
    pub fn new(
        purchases: Arc<dyn PurchaseLookup>,
        store: Arc<dyn TokenStore>,
        signer: Arc<TokenSigner>,
        clock: Arc<dyn Clock>,
        policy: IssuancePolicy,
    ) -> Self {
        Self {
            purchases,
            store,
            signer,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    /// Issue a download token for `purchase_id` on behalf of `buyer_id`
    pub async fn issue(&self, purchase_id: &str, buyer_id: &str) -> Result<IssuedToken> {
        if purchase_id.trim().is_empty() || buyer_id.trim().is_empty() {
            return Err(WicketError::InvalidRequest(
                "purchase id and buyer id are required".into(),
            ));
        }

        let purchase = self
            .purchases
            .find_purchase(purchase_id)
            .await?
            .ok_or_else(|| WicketError::NotFound("purchase".into()))?;

        if purchase.buyer_id != buyer_id {
            warn!(
                purchase_id = %purchase.id,
                requested_by = %buyer_id,
                "Refusing token for purchase owned by another buyer"
            );
            return Err(WicketError::OwnershipMismatch);
        }

        if let Some(limit) = self.policy.max_tokens_per_purchase {
            let issued = self.store.count_for_purchase(&purchase.id).await?;
            if issued >= u64::from(limit) {
                warn!(purchase_id = %purchase.id, issued, limit, "Reissue limit reached");
                return Err(WicketError::ReissueLimit(limit));
            }
        }

        // Whole seconds, so the record expiry and the `exp` claim are equal
        let now = self.clock.now().trunc_subsecs(0);
        let record = TokenRecord::new(&purchase, now, self.policy.validity)?;

        let claims = DownloadClaims {
            token_id: record.id,
            buyer_id: record.buyer_id.clone(),
            artifact_id: record.artifact_id.clone(),
            purchase_id: record.purchase_id.clone(),
            iat: record.created_at.timestamp(),
            exp: record.expires_at.timestamp(),
        };
        let token = self.signer.sign(&claims)?;

        let issued = IssuedToken {
            token,
            token_id: record.id,
            purchase_id: record.purchase_id.clone(),
            buyer_id: record.buyer_id.clone(),
            expires_at: record.expires_at,
        };

        self.store.insert(record).await?;

        info!(
            token_id = %issued.token_id,
            purchase_id = %issued.purchase_id,
            expires_at = %issued.expires_at,
            "Issued download token"
        );

        Ok(issued)
    }
}

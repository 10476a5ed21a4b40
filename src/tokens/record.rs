//! Token records
//!
//! A [`TokenRecord`] is the authoritative server-side state of one issued
//! download token. Bearer tokens are derived from it and never stored.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use crate::catalog::Purchase;
use crate::types::{Result, WicketError};

/// When and from where a token was redeemed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consumption {
    pub at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin: Option<IpAddr>,
}

/// Server-side state of one issued download token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
    pub id: Uuid,
    pub purchase_id: String,
    pub buyer_id: String,
    pub artifact_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set exactly once, by a successful redemption
    pub(crate) consumption: Option<Consumption>,
}

impl TokenRecord {
    /// Create an unconsumed record bound to `purchase`.
    ///
    /// The buyer identity is always taken from the purchase itself.
    pub fn new(purchase: &Purchase, created_at: DateTime<Utc>, validity: Duration) -> Result<Self> {
        if validity <= Duration::zero() {
            return Err(WicketError::Config(
                "token validity window must be positive".into(),
            ));
        }

        let expires_at = created_at.checked_add_signed(validity).ok_or_else(|| {
            WicketError::Config("token validity window overflows the calendar".into())
        })?;

        Ok(Self {
            id: Uuid::new_v4(),
            purchase_id: purchase.id.clone(),
            buyer_id: purchase.buyer_id.clone(),
            artifact_id: purchase.artifact_id.clone(),
            created_at,
            expires_at,
            consumption: None,
        })
    }

    pub fn is_consumed(&self) -> bool {
        self.consumption.is_some()
    }

    pub fn consumption(&self) -> Option<&Consumption> {
        self.consumption.as_ref()
    }

    /// Expired when `now` has reached the expiry instant
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Transition to consumed. Returns false if the record was already
    /// consumed, in which case nothing changes.
    pub(crate) fn mark_consumed(&mut self, at: DateTime<Utc>, origin: Option<IpAddr>) -> bool {
        if self.consumption.is_some() {
            return false;
        }
        self.consumption = Some(Consumption { at, origin });
        true
    }
}

//! Purchase and artifact catalog
//!
//! Purchases and artifacts are owned by the storefront, not by Wicket. The
//! token lifecycle reaches them only through [`PurchaseLookup`] and
//! [`ArtifactResolver`], so a real order database or object store can be
//! dropped in without touching issuance or redemption.

pub mod memory;

pub use memory::{CatalogFile, MemoryCatalog};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::Result;

/// A completed purchase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    pub id: String,
    pub buyer_id: String,
    pub artifact_id: String,
    pub purchased_at: DateTime<Utc>,
}

/// A purchasable report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub title: String,
    /// Key of the private object in storage, e.g. `reports/foo.pdf`
    pub storage_key: String,
}

/// Resolved location of an artifact, handed back on redemption
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactRef {
    pub artifact_id: String,
    pub title: String,
    pub storage_key: String,
    pub location: PathBuf,
}

/// Read access to completed purchases
#[async_trait::async_trait]
pub trait PurchaseLookup: Send + Sync {
    async fn find_purchase(&self, purchase_id: &str) -> Result<Option<Purchase>>;
}

/// Maps artifact ids to deliverable references
#[async_trait::async_trait]
pub trait ArtifactResolver: Send + Sync {
    async fn resolve_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRef>>;
}

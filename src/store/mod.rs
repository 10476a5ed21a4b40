//! Token record storage
//!
//! [`TokenStore`] is the only place token records live. Consumption goes
//! through [`TokenStore::consume`], a per-record compare-and-set: of any
//! number of concurrent callers for one unconsumed record, exactly one gets
//! [`ConsumeOutcome::Consumed`].
//!
//! Backends:
//! - [`MemoryTokenStore`]: sharded in-process map, the default
//! - [`MongoTokenStore`]: MongoDB collection, conditional `findOneAndUpdate`

pub mod memory;
pub mod mongo;

pub use memory::MemoryTokenStore;
pub use mongo::MongoTokenStore;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::net::IpAddr;
use uuid::Uuid;

use crate::tokens::TokenRecord;
use crate::types::Result;

/// Result of a consume attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// This call performed the transition; carries the updated record
    Consumed(TokenRecord),
    /// The record was already consumed, by this or an earlier caller
    AlreadyConsumed,
    /// No record with that id
    Missing,
}

/// Store counters for the status endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_records: u64,
    pub consumed_records: u64,
}

#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly issued record
    async fn insert(&self, record: TokenRecord) -> Result<()>;

    /// Fetch a record by id
    async fn get(&self, id: &Uuid) -> Result<Option<TokenRecord>>;

    /// Atomically set consumed=true if and only if it is currently false
    async fn consume(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
        origin: Option<IpAddr>,
    ) -> Result<ConsumeOutcome>;

    /// Number of records ever issued for a purchase
    async fn count_for_purchase(&self, purchase_id: &str) -> Result<u64>;

    async fn stats(&self) -> Result<StoreStats>;

    /// Backend name for status reporting
    fn backend(&self) -> &'static str;
}

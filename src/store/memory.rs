//! In-memory token store
//!
//! Records live in a `DashMap`. A consume holds the record's shard write
//! guard across the check and the write, so it cannot interleave with
//! another consume of the same record. Other shards stay available.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::net::IpAddr;
use tracing::debug;
use uuid::Uuid;

use super::{ConsumeOutcome, StoreStats, TokenStore};
use crate::tokens::TokenRecord;
use crate::types::{Result, WicketError};

/// Token store with concurrent access
#[derive(Default)]
pub struct MemoryTokenStore {
    records: DashMap<Uuid, TokenRecord>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        match self.records.entry(record.id) {
            Entry::Occupied(_) => Err(WicketError::Internal(format!(
                "token record {} already exists",
                record.id
            ))),
            Entry::Vacant(slot) => {
                debug!(token_id = %record.id, purchase_id = %record.purchase_id, "Stored token record");
                slot.insert(record);
                Ok(())
            }
        }
    }

    async fn get(&self, id: &Uuid) -> Result<Option<TokenRecord>> {
        Ok(self.records.get(id).map(|r| r.clone()))
    }

    async fn consume(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
        origin: Option<IpAddr>,
    ) -> Result<ConsumeOutcome> {
        let Some(mut record) = self.records.get_mut(id) else {
            return Ok(ConsumeOutcome::Missing);
        };

        if record.mark_consumed(at, origin) {
            Ok(ConsumeOutcome::Consumed(record.clone()))
        } else {
            Ok(ConsumeOutcome::AlreadyConsumed)
        }
    }

    async fn count_for_purchase(&self, purchase_id: &str) -> Result<u64> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.purchase_id == purchase_id)
            .count() as u64)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let consumed = self.records.iter().filter(|r| r.is_consumed()).count();
        Ok(StoreStats {
            total_records: self.records.len() as u64,
            consumed_records: consumed as u64,
        })
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

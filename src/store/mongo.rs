//! MongoDB token store
//!
//! Consumption is a single `findOneAndUpdate` filtered on
//! `{token_id, consumed: false}`; the server applies the match and the write
//! atomically, so at most one request can flip a given record.

use bson::{doc, Bson, DateTime as BsonDateTime, Document};
use chrono::{DateTime, Utc};
use std::net::IpAddr;
use tracing::debug;
use uuid::Uuid;

use super::{ConsumeOutcome, StoreStats, TokenStore};
use crate::db::schemas::{DownloadTokenDoc, DOWNLOAD_TOKEN_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::tokens::TokenRecord;
use crate::types::Result;

/// Matches the record only while it is still unconsumed
fn consume_filter(id: &Uuid) -> Document {
    doc! { "token_id": id.to_string(), "consumed": false }
}

fn consume_update(at: DateTime<Utc>, origin: Option<IpAddr>) -> Document {
    let origin: Bson = origin.map(|ip| ip.to_string()).into();
    doc! {
        "$set": {
            "consumed": true,
            "consumed_at": BsonDateTime::from_chrono(at),
            "consumed_from": origin,
            "metadata.updated_at": BsonDateTime::now(),
        }
    }
}

/// MongoDB-backed token store
pub struct MongoTokenStore {
    collection: MongoCollection<DownloadTokenDoc>,
}

impl MongoTokenStore {
    /// Open the token collection, creating its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo
            .collection::<DownloadTokenDoc>(DOWNLOAD_TOKEN_COLLECTION)
            .await?;
        Ok(Self { collection })
    }
}

#[async_trait::async_trait]
impl TokenStore for MongoTokenStore {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        self.collection
            .insert_one(DownloadTokenDoc::from(&record))
            .await?;
        debug!(token_id = %record.id, purchase_id = %record.purchase_id, "Stored token record");
        Ok(())
    }

    async fn get(&self, id: &Uuid) -> Result<Option<TokenRecord>> {
        self.collection
            .find_one(doc! { "token_id": id.to_string() })
            .await?
            .map(TokenRecord::try_from)
            .transpose()
    }

    async fn consume(
        &self,
        id: &Uuid,
        at: DateTime<Utc>,
        origin: Option<IpAddr>,
    ) -> Result<ConsumeOutcome> {
        let updated = self
            .collection
            .find_one_and_update(consume_filter(id), consume_update(at, origin))
            .await?;

        if let Some(doc) = updated {
            return Ok(ConsumeOutcome::Consumed(TokenRecord::try_from(doc)?));
        }

        // The filter missed: either no such record or it is already terminal
        match self.get(id).await? {
            Some(_) => Ok(ConsumeOutcome::AlreadyConsumed),
            None => Ok(ConsumeOutcome::Missing),
        }
    }

    async fn count_for_purchase(&self, purchase_id: &str) -> Result<u64> {
        self.collection
            .count(doc! { "purchase_id": purchase_id })
            .await
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            total_records: self.collection.count(doc! {}).await?,
            consumed_records: self.collection.count(doc! { "consumed": true }).await?,
        })
    }

    fn backend(&self) -> &'static str {
        "mongo"
    }
}

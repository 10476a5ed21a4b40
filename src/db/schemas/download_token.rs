//! Download token document schema
//!
//! One document per issued token record. Documents are never deleted.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use uuid::Uuid;

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::tokens::{Consumption, TokenRecord};
use crate::types::WicketError;

/// Collection name for download tokens
pub const DOWNLOAD_TOKEN_COLLECTION: &str = "download_tokens";

/// Download token record stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DownloadTokenDoc {
    /// MongoDB document ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    /// Common metadata
    #[serde(default)]
    pub metadata: Metadata,

    /// Token record id (UUID string)
    pub token_id: String,

    pub purchase_id: String,

    pub buyer_id: String,

    pub artifact_id: String,

    pub issued_at: DateTime,

    pub expires_at: DateTime,

    /// Flipped exactly once, by a conditional update on `consumed: false`
    #[serde(default)]
    pub consumed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_at: Option<DateTime>,

    /// Origin address of the redeeming request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consumed_from: Option<String>,
}

impl From<&TokenRecord> for DownloadTokenDoc {
    fn from(record: &TokenRecord) -> Self {
        let consumption = record.consumption();
        Self {
            _id: None,
            metadata: Metadata::new(),
            token_id: record.id.to_string(),
            purchase_id: record.purchase_id.clone(),
            buyer_id: record.buyer_id.clone(),
            artifact_id: record.artifact_id.clone(),
            issued_at: DateTime::from_chrono(record.created_at),
            expires_at: DateTime::from_chrono(record.expires_at),
            consumed: consumption.is_some(),
            consumed_at: consumption.map(|c| DateTime::from_chrono(c.at)),
            consumed_from: consumption.and_then(|c| c.origin).map(|ip| ip.to_string()),
        }
    }
}

impl TryFrom<DownloadTokenDoc> for TokenRecord {
    type Error = WicketError;

    fn try_from(doc: DownloadTokenDoc) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&doc.token_id).map_err(|e| {
            WicketError::Database(format!("Corrupt token_id {:?}: {}", doc.token_id, e))
        })?;

        let consumption = match (doc.consumed, doc.consumed_at) {
            (false, _) => None,
            (true, Some(at)) => Some(Consumption {
                at: at.to_chrono(),
                origin: doc
                    .consumed_from
                    .as_deref()
                    .and_then(|s| s.parse::<IpAddr>().ok()),
            }),
            (true, None) => {
                return Err(WicketError::Database(format!(
                    "Token {} is consumed without a consumption time",
                    id
                )))
            }
        };

        Ok(TokenRecord {
            id,
            purchase_id: doc.purchase_id,
            buyer_id: doc.buyer_id,
            artifact_id: doc.artifact_id,
            created_at: doc.issued_at.to_chrono(),
            expires_at: doc.expires_at.to_chrono(),
            consumption,
        })
    }
}

impl IntoIndexes for DownloadTokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Unique index on token_id
            (
                doc! { "token_id": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .name("token_id_unique".to_string())
                        .build(),
                ),
            ),
            // Index on purchase_id for reissue counting
            (
                doc! { "purchase_id": 1 },
                Some(
                    IndexOptions::builder()
                        .name("purchase_id_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for DownloadTokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Purchase;
    use chrono::{Duration, TimeZone, Utc};

    fn record() -> TokenRecord {
        let purchase = Purchase {
            id: "order1".into(),
            buyer_id: "user1".into(),
            artifact_id: "prod1".into(),
            purchased_at: Utc::now(),
        };
        // Whole milliseconds survive the BSON round trip exactly
        let created = Utc.with_ymd_and_hms(2025, 5, 7, 10, 0, 0).unwrap();
        TokenRecord::new(&purchase, created, Duration::hours(24)).unwrap()
    }

    #[test]
    fn test_unconsumed_record_document() {
        let rec = record();
        let doc = DownloadTokenDoc::from(&rec);

        assert!(!doc.consumed);
        assert!(doc.consumed_at.is_none());
        assert_eq!(doc.token_id, rec.id.to_string());
        assert_eq!(TokenRecord::try_from(doc).unwrap(), rec);
    }

    #[test]
    fn test_consumed_record_document() {
        let mut rec = record();
        let origin: IpAddr = "192.168.1.20".parse().unwrap();
        rec.mark_consumed(rec.created_at + Duration::minutes(5), Some(origin));

        let doc = DownloadTokenDoc::from(&rec);
        assert!(doc.consumed);
        assert_eq!(doc.consumed_from.as_deref(), Some("192.168.1.20"));
        assert_eq!(TokenRecord::try_from(doc).unwrap(), rec);
    }

    #[test]
    fn test_consumed_without_time_is_corrupt() {
        let mut doc = DownloadTokenDoc::from(&record());
        doc.consumed = true;

        assert!(matches!(
            TokenRecord::try_from(doc),
            Err(WicketError::Database(_))
        ));
    }

    #[test]
    fn test_bad_token_id_is_corrupt() {
        let mut doc = DownloadTokenDoc::from(&record());
        doc.token_id = "token_123_abc".into();

        assert!(TokenRecord::try_from(doc).is_err());
    }
}

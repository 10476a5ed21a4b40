//! In-memory catalog
//!
//! Backs both catalog traits with concurrent maps. Contents come from a JSON
//! catalog file or from the built-in demo data.

use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use super::{Artifact, ArtifactRef, ArtifactResolver, Purchase, PurchaseLookup};
use crate::types::{Result, WicketError};

/// On-disk catalog format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFile {
    #[serde(default)]
    pub purchases: Vec<Purchase>,
    #[serde(default)]
    pub artifacts: Vec<Artifact>,
}

/// Catalog held in memory
pub struct MemoryCatalog {
    purchases: DashMap<String, Purchase>,
    artifacts: DashMap<String, Artifact>,
    /// Directory that stands in for the private report bucket
    files_dir: PathBuf,
}

impl MemoryCatalog {
    /// Create an empty catalog
    pub fn new(files_dir: impl Into<PathBuf>) -> Self {
        Self {
            purchases: DashMap::new(),
            artifacts: DashMap::new(),
            files_dir: files_dir.into(),
        }
    }

    /// Load purchases and artifacts from a JSON catalog file
    pub fn from_file(path: &Path, files_dir: impl Into<PathBuf>) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            WicketError::Config(format!("Failed to read catalog {}: {}", path.display(), e))
        })?;
        let file: CatalogFile = serde_json::from_str(&raw).map_err(|e| {
            WicketError::Config(format!("Invalid catalog {}: {}", path.display(), e))
        })?;

        let catalog = Self::new(files_dir);
        catalog.load(file);
        info!(
            "Loaded catalog from {} ({} purchases, {} artifacts)",
            path.display(),
            catalog.purchases.len(),
            catalog.artifacts.len()
        );
        Ok(catalog)
    }

    /// Catalog with the demo report, buyer and order
    pub fn with_demo_data(files_dir: impl Into<PathBuf>) -> Self {
        let catalog = Self::new(files_dir);
        catalog.insert_artifact(Artifact {
            id: "prod1".into(),
            title: "123 Main St, Sydney - Property Inspection Report".into(),
            storage_key: "reports/123-main-st-sydney-20250507.pdf".into(),
        });
        catalog.insert_purchase(Purchase {
            id: "order1".into(),
            buyer_id: "user1".into(),
            artifact_id: "prod1".into(),
            purchased_at: Utc::now(),
        });
        catalog
    }

    pub fn load(&self, file: CatalogFile) {
        for artifact in file.artifacts {
            self.insert_artifact(artifact);
        }
        for purchase in file.purchases {
            self.insert_purchase(purchase);
        }
    }

    pub fn insert_purchase(&self, purchase: Purchase) {
        self.purchases.insert(purchase.id.clone(), purchase);
    }

    pub fn insert_artifact(&self, artifact: Artifact) {
        self.artifacts.insert(artifact.id.clone(), artifact);
    }

    /// Withdraw an artifact from sale. Existing purchases keep pointing at it.
    pub fn remove_artifact(&self, artifact_id: &str) -> Option<Artifact> {
        self.artifacts.remove(artifact_id).map(|(_, a)| a)
    }

    pub fn purchase_count(&self) -> usize {
        self.purchases.len()
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.len()
    }

    /// Local path for a storage key: the key's file name under `files_dir`
    fn locate(&self, storage_key: &str) -> PathBuf {
        let file_name = Path::new(storage_key)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(storage_key));
        self.files_dir.join(file_name)
    }
}

#[async_trait::async_trait]
impl PurchaseLookup for MemoryCatalog {
    async fn find_purchase(&self, purchase_id: &str) -> Result<Option<Purchase>> {
        Ok(self.purchases.get(purchase_id).map(|p| p.clone()))
    }
}

#[async_trait::async_trait]
impl ArtifactResolver for MemoryCatalog {
    async fn resolve_artifact(&self, artifact_id: &str) -> Result<Option<ArtifactRef>> {
        Ok(self.artifacts.get(artifact_id).map(|artifact| ArtifactRef {
            artifact_id: artifact.id.clone(),
            title: artifact.title.clone(),
            storage_key: artifact.storage_key.clone(),
            location: self.locate(&artifact.storage_key),
        }))
    }
}

//! Configuration for Wicket
//!
//! CLI arguments and environment variable handling using clap.

use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use uuid::Uuid;

use crate::auth::{SigningKey, MIN_SECRET_LEN};
use crate::tokens::IssuancePolicy;
use crate::types::{Result as WicketResult, WicketError};

/// Longest accepted token validity window (one year)
pub const MAX_TOKEN_EXPIRY_HOURS: i64 = 366 * 24;

/// Where token records are kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackend {
    /// In-process map; records are lost on restart
    Memory,
    /// MongoDB collection
    Mongo,
}

/// Wicket - single-use download tokens for purchased reports
#[derive(Parser, Debug, Clone)]
#[command(name = "wicket")]
#[command(about = "Issues and redeems single-use download tokens for purchased reports")]
pub struct Args {
    /// Unique node identifier for this instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Public base URL used to build download links
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:3000")]
    pub base_url: String,

    /// Enable development mode (ephemeral signing key, demo catalog)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// HMAC secret for token signing (HS256)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Ed25519 private key in PEM form (EdDSA); overrides JWT_SECRET
    #[arg(long, env = "SIGNING_KEY_FILE", requires = "verifying_key_file")]
    pub signing_key_file: Option<PathBuf>,

    /// Ed25519 public key in PEM form
    #[arg(long, env = "VERIFYING_KEY_FILE", requires = "signing_key_file")]
    pub verifying_key_file: Option<PathBuf>,

    /// Validity window of a download token in hours
    #[arg(long, env = "TOKEN_EXPIRY_HOURS", default_value = "24")]
    pub token_expiry_hours: i64,

    /// Maximum tokens per purchase (unlimited when unset)
    #[arg(long, env = "MAX_TOKENS_PER_PURCHASE")]
    pub max_tokens_per_purchase: Option<u32>,

    /// Token record store backend
    #[arg(long, env = "STORE", value_enum, default_value_t = StoreBackend::Memory)]
    pub store: StoreBackend,

    /// MongoDB connection URI
    #[arg(long, env = "MONGODB_URI", default_value = "mongodb://localhost:27017")]
    pub mongodb_uri: String,

    /// MongoDB database name
    #[arg(long, env = "MONGODB_DB", default_value = "wicket")]
    pub mongodb_db: String,

    /// JSON file with purchases and artifacts
    #[arg(long, env = "CATALOG_FILE")]
    pub catalog_file: Option<PathBuf>,

    /// Seed the demo buyer, report and order
    #[arg(long, env = "SEED_DEMO_DATA", default_value = "false")]
    pub seed_demo_data: bool,

    /// Directory holding report files
    #[arg(long, env = "FILES_DIR", default_value = "./mock-files")]
    pub files_dir: PathBuf,

    /// JSONL audit trail of issuance and download attempts
    #[arg(long, env = "AUDIT_LOG")]
    pub audit_log: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,
}

impl Args {
    /// Key material from configuration.
    ///
    /// `None` means no key was configured; only acceptable in dev mode.
    pub fn signing_key(&self) -> std::io::Result<Option<SigningKey>> {
        if let (Some(private), Some(public)) = (&self.signing_key_file, &self.verifying_key_file) {
            return Ok(Some(SigningKey::Ed25519 {
                private_pem: std::fs::read(private)?,
                public_pem: std::fs::read(public)?,
            }));
        }

        Ok(self.jwt_secret.clone().map(SigningKey::Hmac))
    }

    /// Issuance settings derived from configuration
    pub fn issuance_policy(&self) -> WicketResult<IssuancePolicy> {
        let validity = chrono::Duration::try_hours(self.token_expiry_hours).ok_or_else(|| {
            WicketError::Config(format!(
                "TOKEN_EXPIRY_HOURS out of range: {}",
                self.token_expiry_hours
            ))
        })?;

        Ok(IssuancePolicy {
            validity,
            max_tokens_per_purchase: self.max_tokens_per_purchase,
        })
    }

    fn has_signing_key(&self) -> bool {
        self.jwt_secret.is_some() || self.signing_key_file.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && !self.has_signing_key() {
            return Err(
                "JWT_SECRET or SIGNING_KEY_FILE is required in production mode".to_string(),
            );
        }

        if let Some(secret) = &self.jwt_secret {
            if secret.len() < MIN_SECRET_LEN {
                return Err(format!(
                    "JWT_SECRET must be at least {} characters",
                    MIN_SECRET_LEN
                ));
            }
        }

        if self.token_expiry_hours <= 0 {
            return Err("TOKEN_EXPIRY_HOURS must be positive".to_string());
        }

        if self.token_expiry_hours > MAX_TOKEN_EXPIRY_HOURS {
            return Err(format!(
                "TOKEN_EXPIRY_HOURS must be at most {}",
                MAX_TOKEN_EXPIRY_HOURS
            ));
        }

        if self.max_tokens_per_purchase == Some(0) {
            return Err("MAX_TOKENS_PER_PURCHASE must be at least 1 when set".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be positive".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-characters-long";

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("wicket").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let args = parse(&["--jwt-secret", SECRET]);
        assert_eq!(args.token_expiry_hours, 24);
        assert_eq!(args.store, StoreBackend::Memory);
        assert!(args.max_tokens_per_purchase.is_none());
        assert!(args.validate().is_ok());

        let policy = args.issuance_policy().unwrap();
        assert_eq!(policy.validity, chrono::Duration::hours(24));
    }

    #[test]
    fn test_production_requires_key() {
        let args = parse(&[]);
        assert!(args.validate().is_err());

        let dev = parse(&["--dev-mode"]);
        assert!(dev.validate().is_ok());
        assert!(dev.signing_key().unwrap().is_none());
    }

    #[test]
    fn test_rejects_short_secret() {
        let args = parse(&["--jwt-secret", "short"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_validity() {
        let args = parse(&["--jwt-secret", SECRET, "--token-expiry-hours", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_rejects_oversized_validity() {
        let args = parse(&["--jwt-secret", SECRET, "--token-expiry-hours", "10000000000"]);
        assert!(args.validate().is_err());

        let huge = parse(&["--jwt-secret", SECRET, "--token-expiry-hours", "9000000000000"]);
        assert!(huge.validate().is_err());
        assert!(matches!(huge.issuance_policy(), Err(WicketError::Config(_))));

        let year = parse(&["--jwt-secret", SECRET, "--token-expiry-hours", "8784"]);
        assert!(year.validate().is_ok());
        assert!(year.issuance_policy().is_ok());
    }

    #[test]
    fn test_reissue_cap() {
        let args = parse(&["--jwt-secret", SECRET, "--max-tokens-per-purchase", "3"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.issuance_policy().unwrap().max_tokens_per_purchase, Some(3));

        let zero = parse(&["--jwt-secret", SECRET, "--max-tokens-per-purchase", "0"]);
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_store_backend_flag() {
        let args = parse(&["--jwt-secret", SECRET, "--store", "mongo"]);
        assert_eq!(args.store, StoreBackend::Mongo);
    }

    #[test]
    fn test_key_files_must_come_in_pairs() {
        let result = Args::try_parse_from(["wicket", "--signing-key-file", "/tmp/key.pem"]);
        assert!(result.is_err());
    }
}

//! Bearer token signing
//!
//! Download tokens are JWTs carrying the record id and the purchase binding.
//!
//! Security notes:
//! - HS256 with a secret of at least 32 characters, or EdDSA with PEM keys
//! - Keys only ever come from configuration. Dev mode without a key gets a
//!   random per-process secret, so its tokens die with the process.
//! - `verify` checks signature and shape only. Expiry is judged by the
//!   redeemer against its own clock reading.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::{Result, WicketError};

/// Minimum accepted HMAC secret length
pub const MIN_SECRET_LEN: usize = 32;

/// Payload of a download token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadClaims {
    /// Token record identifier
    pub token_id: Uuid,
    /// Buyer the token was issued to
    pub buyer_id: String,
    /// Artifact the token unlocks
    pub artifact_id: String,
    /// Purchase that produced the token
    pub purchase_id: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp), equal to the record's expiry
    pub exp: i64,
}

/// Key material for the signer
pub enum SigningKey {
    /// Shared secret, HS256
    Hmac(String),
    /// Ed25519 key pair in PEM form, EdDSA
    Ed25519 {
        private_pem: Vec<u8>,
        public_pem: Vec<u8>,
    },
}

/// Signs and verifies download tokens
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    /// Build a signer from configured key material
    pub fn new(key: SigningKey) -> Result<Self> {
        match key {
            SigningKey::Hmac(secret) => Self::hmac(&secret),
            SigningKey::Ed25519 {
                private_pem,
                public_pem,
            } => Self::ed25519(&private_pem, &public_pem),
        }
    }

    /// HS256 signer
    ///
    /// Returns an error if the secret is empty or too short
    pub fn hmac(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(WicketError::Config(
                "JWT_SECRET is required in production mode".into(),
            ));
        }

        if secret.len() < MIN_SECRET_LEN {
            return Err(WicketError::Config(format!(
                "JWT_SECRET must be at least {} characters",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self::build(
            Algorithm::HS256,
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()),
        ))
    }

    /// EdDSA signer from PEM-encoded Ed25519 keys
    pub fn ed25519(private_pem: &[u8], public_pem: &[u8]) -> Result<Self> {
        let encoding = EncodingKey::from_ed_pem(private_pem)
            .map_err(|e| WicketError::Config(format!("Invalid signing key: {}", e)))?;
        let decoding = DecodingKey::from_ed_pem(public_pem)
            .map_err(|e| WicketError::Config(format!("Invalid verifying key: {}", e)))?;

        Ok(Self::build(Algorithm::EdDSA, encoding, decoding))
    }

    /// Signer with a random secret that lives as long as the process
    pub fn ephemeral() -> Self {
        let secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        Self::build(
            Algorithm::HS256,
            EncodingKey::from_secret(secret.as_bytes()),
            DecodingKey::from_secret(secret.as_bytes()),
        )
    }

    fn build(algorithm: Algorithm, encoding: EncodingKey, decoding: DecodingKey) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;

        Self {
            algorithm,
            encoding,
            decoding,
            validation,
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Encode and sign claims into a bearer string
    pub fn sign(&self, claims: &DownloadClaims) -> Result<String> {
        encode(&Header::new(self.algorithm), claims, &self.encoding)
            .map_err(|e| WicketError::Internal(format!("Failed to sign token: {}", e)))
    }

    /// Decode a bearer string and verify its signature.
    ///
    /// Fails with `Malformed` for anything that is not a well-formed token
    /// with our claim set, and `BadSignature` when the signature or the
    /// declared algorithm does not match this signer.
    pub fn verify(&self, token: &str) -> Result<DownloadClaims> {
        decode::<DownloadClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(WicketError::from)
    }
}

/// Short stable identifier for a bearer token, safe to log
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

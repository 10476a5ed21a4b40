//! Bearer token signing and verification for Wicket
//!
//! Provides:
//! - Download token claims
//! - HS256 / EdDSA signing from configured key material
//! - Log-safe token fingerprints

pub mod jwt;

pub use jwt::{fingerprint, DownloadClaims, SigningKey, TokenSigner, MIN_SECRET_LEN};

//! Database schemas for Wicket
//!
//! Defines MongoDB document structures for token records.

mod download_token;
mod metadata;

pub use download_token::{DownloadTokenDoc, DOWNLOAD_TOKEN_COLLECTION};
pub use metadata::Metadata;

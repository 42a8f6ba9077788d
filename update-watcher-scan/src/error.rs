//! Typed errors for metadata retrieval.
//!
//! None of these abort a scan: the detector logs them and treats the affected
//! component kind as having no update information.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetadataError {
    /// The endpoint URL failed validation before any request was made.
    #[error("Invalid metadata URL: {0}")]
    InvalidUrl(String),

    /// The HTTP request failed (DNS, TLS, connection, non-2xx, body limit).
    #[error("Metadata request failed: {0}")]
    Http(String),

    /// The response body was not the expected JSON shape.
    #[error("Failed to parse update metadata: {0}")]
    Parse(#[from] serde_json::Error),

    /// A local manifest could not be read.
    #[error("Failed to read site manifest: {0}")]
    Io(#[from] std::io::Error),

    /// A local manifest was not valid YAML/JSON.
    #[error("Failed to parse site manifest: {0}")]
    Manifest(#[from] serde_yaml_ng::Error),
}

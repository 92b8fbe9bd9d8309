//! Authentication errors.

use std::path::PathBuf;

/// Failure to obtain a bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read credentials file {path}: {source}")]
    CredentialsRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed credentials file {path}: {source}")]
    CredentialsParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to parse private key: {0}")]
    KeyParse(#[source] jsonwebtoken::errors::Error),

    #[error("failed to encode JWT: {0}")]
    JwtEncode(#[source] jsonwebtoken::errors::Error),

    #[error("token request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("token request rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("failed to parse token response: {0}")]
    ResponseParse(#[source] reqwest::Error),
}

use thiserror::Error;

use crate::flickr::FlickrError;

/// Failures of the OAuth token exchange and the token cache.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Flickr rejected the token request (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Token response is missing '{0}'")]
    MissingField(&'static str),

    #[error("No OAuth flow in progress")]
    NoPendingFlow,

    #[error("OAuth verification failed: {0}")]
    Verification(String),

    #[error(transparent)]
    Signing(#[from] FlickrError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

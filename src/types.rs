//! Shared error taxonomy for the finalization pipeline
//!
//! Only three variants are fatal to a finalize call (`InvalidId`,
//! `NoIdentityOnToken`, `ChainRead`). Everything else is a degradation
//! class: the orchestrator logs it and narrows the result instead of
//! failing the call.

use thiserror::Error;

/// Errors produced by the finalization pipeline
#[derive(Debug, Error)]
pub enum KilnError {
    /// Non-positive or unparseable token id; rejected before any I/O
    #[error("invalid-id")]
    InvalidId,

    /// Identity resolution succeeded but the token carries no usable fid
    #[error("no-fid-on-token")]
    NoIdentityOnToken,

    /// Identity resolution itself failed (network, timeout, RPC error)
    #[error("chain read failed: {0}")]
    ChainRead(String),

    /// Image generation unavailable or failed; triggers the fallback image
    #[error("artwork generation failed: {0}")]
    ArtworkFailed(String),

    /// Pin destination rejected the upload
    #[error("pin upload failed: {0}")]
    PinUpload(String),

    /// Pin destination accepted the bytes but produced no content identifier.
    /// A silent pin with no permanent address is worse than a loud failure.
    #[error("pin destination returned no content identifier")]
    MissingContentIdentifier,

    /// Best-effort persistence failed; logged by the caller, never surfaced
    #[error("database error: {0}")]
    Database(String),
}

impl KilnError {
    /// Whether this error may surface as `ok: false` to an HTTP caller.
    /// Everything else degrades the result per the propagation policy.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            KilnError::InvalidId | KilnError::NoIdentityOnToken | KilnError::ChainRead(_)
        )
    }

    /// Stable machine-readable code for the HTTP error envelope
    pub fn code(&self) -> String {
        match self {
            KilnError::InvalidId => "invalid-id".to_string(),
            KilnError::NoIdentityOnToken => "no-fid-on-token".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KilnError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification_matches_propagation_policy() {
        assert!(KilnError::InvalidId.is_fatal());
        assert!(KilnError::NoIdentityOnToken.is_fatal());
        assert!(KilnError::ChainRead("timeout".into()).is_fatal());

        assert!(!KilnError::ArtworkFailed("503".into()).is_fatal());
        assert!(!KilnError::PinUpload("denied".into()).is_fatal());
        assert!(!KilnError::MissingContentIdentifier.is_fatal());
        assert!(!KilnError::Database("down".into()).is_fatal());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(KilnError::InvalidId.code(), "invalid-id");
        assert_eq!(KilnError::NoIdentityOnToken.code(), "no-fid-on-token");
        assert!(KilnError::ChainRead("x".into()).code().starts_with("chain read failed"));
    }
}

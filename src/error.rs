//! Error types for the CBS authentication core.

use thiserror::Error;

/// Errors produced by the credential store, token minter, CBS adapter, and
/// state machine.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required argument was missing or a CBS handle was required but not
    /// supplied, or an unrecognized `set_option` name was used.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Credential configuration was ambiguous: zero or more than one of
    /// `device_key` / `device_sas_token` / x509 pair was supplied.
    #[error("invalid credential configuration: {0}")]
    InvalidConfig(String),

    /// The requested operation is not permitted from the current status.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The injected SAS signer failed to produce a token.
    #[error("SAS token signing failed")]
    SignerFailure(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The injected time source returned the indefinite sentinel.
    #[error("clock unavailable")]
    ClockUnavailable,

    /// The synchronous half of `put_token` / `delete_token` reported failure.
    #[error("failed submitting request to CBS: {0}")]
    SubmitFailed(String),

    /// CBS reported a non-OK completion for a `put_token` / `delete_token`
    /// request.
    #[error("CBS rejected the request (status {status_code}): {status_description}")]
    CbsRejected {
        /// Status code reported by CBS.
        status_code: u32,
        /// Human-readable description reported by CBS.
        status_description: String,
    },

    /// A `put_token` completion did not arrive within `cbs_request_timeout`.
    #[error("timed out waiting for CBS to complete the request")]
    Timeout,

    /// Defensive: a credential variant reached a code path that `start`'s
    /// validation should have made unreachable.
    #[error("unexpected credential type for this operation")]
    UnexpectedCredentialType,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;

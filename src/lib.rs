//! # iothub-cbs-auth
//!
//! The authentication core of an AMQP-based IoT device transport: it manages
//! the lifecycle of device credentials against a Claims-Based Security (CBS)
//! peer — minting or accepting a Shared Access Signature (SAS) token,
//! submitting it to CBS, tracking the in-flight request against a deadline,
//! refreshing the token before expiry, and revoking it cleanly on shutdown.
//!
//! ## Modules
//!
//! - [`identity`]: device identity and the CBS audience derived from it.
//! - [`credential`]: the tagged credential variant (symmetric key,
//!   pre-minted SAS token, or X.509 indicator) a device authenticates with.
//! - [`config`]: builder-style configuration for the credential store and
//!   the timing parameters (`sas_token_lifetime`, `sas_token_refresh_time`,
//!   `cbs_request_timeout`).
//! - [`signer`]: the injected SAS-signing trait and a default
//!   HMAC-SHA256 implementation of IoT Hub's device SAS token format.
//! - [`clock`]: the injected wall-clock time source.
//! - [`cbs`]: the CBS client adapter trait, plus an in-process loopback
//!   implementation used by tests and the bundled demo binary.
//! - [`state_machine`]: the top-level [`state_machine::AuthenticationStateMachine`]
//!   that coordinates the above against a transport's periodic tick.
//! - [`error`]: the crate's error taxonomy.

#![forbid(unsafe_code)]
#![deny(
    clippy::indexing_slicing,
    clippy::manual_assert,
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used
)]

pub mod cbs;
pub mod clock;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod signer;
pub mod state_machine;
pub mod status;

pub use config::{AuthConfig, CbsConfig};
pub use credential::{Credential, CredentialType, DeviceKey};
pub use error::{AuthError, Result};
pub use identity::Identity;
pub use state_machine::AuthenticationStateMachine;
pub use status::{AuthenticationStatus, StopResult};

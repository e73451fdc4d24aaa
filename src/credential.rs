//! The credential variant a device authenticates with.

use std::fmt;

/// Which lifecycle rules apply to a [`Credential`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialType {
    /// No credential has been configured yet. Only observed transiently
    /// during construction; never reachable after a successful
    /// [`Credential`] construction.
    None,
    /// Symmetric key; the core mints and refreshes SAS tokens from it.
    DeviceKey,
    /// A pre-minted SAS token supplied by the caller; submitted as-is and
    /// never refreshed.
    DeviceSasToken,
    /// X.509 certificate-based authentication. Recognized so that callers
    /// composing the TLS layer elsewhere can branch on it, but this core
    /// never mints or submits a token for it.
    X509,
}

/// A symmetric device key. Does not implement `Debug`/`Display` with its
/// contents to avoid leaking key material into logs.
#[derive(Clone)]
pub struct DeviceKey(Vec<u8>);

impl DeviceKey {
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for DeviceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeviceKey").field(&"<redacted>").finish()
    }
}

/// An X.509 certificate/private-key pair, carried but never acted on by
/// this core.
#[derive(Debug, Clone)]
pub struct X509Credential {
    pub certificate: String,
    pub private_key: String,
}

/// The tagged credential variant a device is configured with.
///
/// Exactly one non-`None` variant is ever held by a constructed
/// [`crate::identity::Identity`]-scoped credential store; `None` is a
/// transient placeholder that [`crate::AuthConfig`] validation rejects.
#[derive(Debug, Clone)]
pub enum Credential {
    None,
    DeviceKey(DeviceKey),
    DeviceSasToken(String),
    X509(X509Credential),
}

impl Credential {
    #[must_use]
    pub fn credential_type(&self) -> CredentialType {
        match self {
            Self::None => CredentialType::None,
            Self::DeviceKey(_) => CredentialType::DeviceKey,
            Self::DeviceSasToken(_) => CredentialType::DeviceSasToken,
            Self::X509(_) => CredentialType::X509,
        }
    }

    /// Whether this variant requires a CBS handle to be supplied to `start`.
    #[must_use]
    pub fn requires_cbs(&self) -> bool {
        matches!(self, Self::DeviceKey(_) | Self::DeviceSasToken(_))
    }
}

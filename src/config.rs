//! Configuration records consumed by the credential store and the state
//! machine's timing parameters.

use serde::{Deserialize, Serialize};

use crate::credential::{Credential, DeviceKey, X509Credential};
use crate::error::AuthError;
use crate::identity::Identity;

/// Configuration for the credential store: device identity plus exactly one
/// credential variant.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    device_id: Option<String>,
    hub_fqdn: Option<String>,
    device_sas_token: Option<String>,
    device_key: Option<Vec<u8>>,
    x509_certificate: Option<String>,
    x509_private_key: Option<String>,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_device_id(mut self, device_id: impl Into<String>) -> Self {
        self.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn with_hub_fqdn(mut self, hub_fqdn: impl Into<String>) -> Self {
        self.hub_fqdn = Some(hub_fqdn.into());
        self
    }

    #[must_use]
    pub fn with_device_sas_token(mut self, token: impl Into<String>) -> Self {
        self.device_sas_token = Some(token.into());
        self
    }

    #[must_use]
    pub fn with_device_key(mut self, key: impl Into<Vec<u8>>) -> Self {
        self.device_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_x509(mut self, certificate: impl Into<String>, private_key: impl Into<String>) -> Self {
        self.x509_certificate = Some(certificate.into());
        self.x509_private_key = Some(private_key.into());
        self
    }

    /// Validate and consume this config into an [`Identity`] and
    /// [`Credential`] pair: the credential store proper.
    ///
    /// Exactly one of `device_sas_token`, `device_key`, or the x509 pair
    /// must be present; `device_id` and `hub_fqdn` are both required and
    /// must be non-empty.
    pub fn build(self) -> Result<(Identity, Credential), AuthError> {
        let device_id = self
            .device_id
            .ok_or_else(|| AuthError::InvalidConfig("device_id is required".to_owned()))?;
        let hub_fqdn = self
            .hub_fqdn
            .ok_or_else(|| AuthError::InvalidConfig("hub_fqdn is required".to_owned()))?;
        let identity = Identity::new(device_id, hub_fqdn)?;

        let provided = usize::from(self.device_sas_token.is_some())
            + usize::from(self.device_key.is_some())
            + usize::from(self.x509_certificate.is_some() || self.x509_private_key.is_some());

        if provided != 1 {
            return Err(AuthError::InvalidConfig(
                "exactly one of device_key, device_sas_token, or an x509 certificate/private key pair must be provided".to_owned(),
            ));
        }

        let credential = if let Some(token) = self.device_sas_token {
            Credential::DeviceSasToken(token)
        } else if let Some(key) = self.device_key {
            Credential::DeviceKey(DeviceKey::new(key))
        } else {
            let certificate = self.x509_certificate.ok_or_else(|| {
                AuthError::InvalidConfig("x509_private_key given without x509_certificate".to_owned())
            })?;
            let private_key = self.x509_private_key.ok_or_else(|| {
                AuthError::InvalidConfig("x509_certificate given without x509_private_key".to_owned())
            })?;
            Credential::X509(X509Credential {
                certificate,
                private_key,
            })
        };

        Ok((identity, credential))
    }
}

/// Timing parameters governing SAS token lifetime, refresh, and CBS request
/// timeout.
///
/// Defaults mirror the source's implicit constants: one hour lifetime,
/// forty-five minute refresh window, and a thirty second CBS timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CbsConfig {
    pub sas_token_lifetime_ms: u64,
    pub sas_token_refresh_ms: u64,
    pub cbs_request_timeout_ms: u64,
}

impl Default for CbsConfig {
    fn default() -> Self {
        Self {
            sas_token_lifetime_ms: 3_600_000,
            sas_token_refresh_ms: 2_700_000,
            cbs_request_timeout_ms: 30_000,
        }
    }
}

impl CbsConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_sas_token_lifetime_ms(mut self, value: u64) -> Self {
        self.sas_token_lifetime_ms = value;
        self
    }

    #[must_use]
    pub fn with_sas_token_refresh_ms(mut self, value: u64) -> Self {
        self.sas_token_refresh_ms = value;
        self
    }

    #[must_use]
    pub fn with_cbs_request_timeout_ms(mut self, value: u64) -> Self {
        self.cbs_request_timeout_ms = value;
        self
    }
}

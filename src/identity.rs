//! Device identity and the audience string derived from it.

use serde::{Deserialize, Serialize};

/// The immutable (device id, IoT hub FQDN) pair a credential is scoped to.
///
/// Both fields are validated non-empty at construction and owned for the
/// lifetime of the state machine built on top of this identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    device_id: String,
    hub_fqdn: String,
}

impl Identity {
    /// Create a new `Identity`, failing if either field is empty.
    pub fn new<D, H>(device_id: D, hub_fqdn: H) -> Result<Self, crate::AuthError>
    where
        D: Into<String>,
        H: Into<String>,
    {
        let device_id = device_id.into();
        let hub_fqdn = hub_fqdn.into();

        if device_id.is_empty() {
            return Err(crate::AuthError::InvalidConfig(
                "device_id must not be empty".to_owned(),
            ));
        }
        if hub_fqdn.is_empty() {
            return Err(crate::AuthError::InvalidConfig(
                "hub_fqdn must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            device_id,
            hub_fqdn,
        })
    }

    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    #[must_use]
    pub fn hub_fqdn(&self) -> &str {
        &self.hub_fqdn
    }

    /// The CBS audience (a.k.a. `devices_path`): `{hub_fqdn}/devices/{device_id}`.
    ///
    /// The source this crate is modeled on names the equivalent helper's
    /// parameters in the opposite order it actually passes them in at both
    /// call sites; this method takes no positional parameters at all, so
    /// that class of mismatch cannot occur here.
    #[must_use]
    pub fn audience(&self) -> String {
        format!("{}/devices/{}", self.hub_fqdn, self.device_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_is_fqdn_then_device_id() -> Result<(), crate::AuthError> {
        let id = Identity::new("dev1", "hub.example.net")?;
        assert_eq!(id.audience(), "hub.example.net/devices/dev1");
        Ok(())
    }

    #[test]
    fn rejects_empty_device_id() {
        assert!(Identity::new("", "hub.example.net").is_err());
    }

    #[test]
    fn rejects_empty_hub_fqdn() {
        assert!(Identity::new("dev1", "").is_err());
    }
}

//! SAS token minting: the signer trait and a default HMAC-SHA256
//! implementation of IoT Hub's device SAS token format.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;
use url::form_urlencoded;

/// Error produced by a [`SasSigner`].
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing key was rejected: {0}")]
    InvalidKey(String),
    #[error("signer backend failed: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Produces a SAS token string for a given key, audience, key name, and
/// absolute expiry.
///
/// Implementations are free to call out to an HSM, a cloud KMS, or (as with
/// [`HmacSha256Signer`]) compute the signature locally. The core only
/// depends on this trait, never on a concrete signing mechanism.
pub trait SasSigner: std::fmt::Debug + Send + Sync {
    /// Sign `audience` with `key`, embedding `key_name` (may be empty) and
    /// `expiry_epoch_seconds`, returning the token string to submit to CBS.
    fn sign(
        &self,
        key: &[u8],
        audience: &str,
        key_name: &str,
        expiry_epoch_seconds: u64,
    ) -> Result<String, SignerError>;
}

/// The canonical IoT Hub device SAS token: an HMAC-SHA256 signature over
/// `{url-encoded audience}\n{expiry}`, base64-encoded, assembled into
/// `SharedAccessSignature sr=<audience>&sig=<signature>&se=<expiry>[&skn=<key_name>]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256Signer;

impl SasSigner for HmacSha256Signer {
    fn sign(
        &self,
        key: &[u8],
        audience: &str,
        key_name: &str,
        expiry_epoch_seconds: u64,
    ) -> Result<String, SignerError> {
        let encoded_audience: String =
            form_urlencoded::byte_serialize(audience.as_bytes()).collect();

        let string_to_sign = format!("{encoded_audience}\n{expiry_epoch_seconds}");

        let mut mac = Hmac::<Sha256>::new_from_slice(key)
            .map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let encoded_signature: String =
            form_urlencoded::byte_serialize(signature.as_bytes()).collect();

        let mut token = format!(
            "SharedAccessSignature sr={encoded_audience}&sig={encoded_signature}&se={expiry_epoch_seconds}"
        );
        if !key_name.is_empty() {
            let encoded_key_name: String =
                form_urlencoded::byte_serialize(key_name.as_bytes()).collect();
            token.push_str("&skn=");
            token.push_str(&encoded_key_name);
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_contains_expected_fields() -> Result<(), SignerError> {
        let signer = HmacSha256Signer;
        let token = signer.sign(b"test-key", "hub.example.net/devices/dev1", "", 1_700_000_000)?;
        assert!(token.starts_with("SharedAccessSignature sr="));
        assert!(token.contains("&sig="));
        assert!(token.contains("&se=1700000000"));
        assert!(!token.contains("&skn="));
        Ok(())
    }

    #[test]
    fn token_includes_key_name_when_present() -> Result<(), SignerError> {
        let signer = HmacSha256Signer;
        let token =
            signer.sign(b"test-key", "hub.example.net/devices/dev1", "primary", 1_700_000_000)?;
        assert!(token.contains("&skn=primary"));
        Ok(())
    }

    #[test]
    fn signing_is_deterministic() -> Result<(), SignerError> {
        let signer = HmacSha256Signer;
        let a = signer.sign(b"test-key", "hub.example.net/devices/dev1", "", 1_700_000_000)?;
        let b = signer.sign(b"test-key", "hub.example.net/devices/dev1", "", 1_700_000_000)?;
        assert_eq!(a, b);
        Ok(())
    }
}

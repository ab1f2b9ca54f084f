//! Request signing for the authenticated futures WebSocket.
//!
//! The login request is signed with **HMAC-SHA256** over `apiKey + reqTime`
//! using the API secret; the signature travels as a lowercase hex string.

use hmac::{Hmac, Mac};
use mx_core::MxError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// HMAC-SHA256 keyed once with the API secret.
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    pub fn new(secret: &str) -> Result<Self, MxError> {
        if secret.is_empty() {
            return Err(MxError::Credentials("secret key is empty".into()));
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| MxError::Credentials(format!("invalid secret key: {e}")))?;
        Ok(Self { mac })
    }

    /// Lowercase hex signature of `message`.
    pub fn sign(&self, message: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(message.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl std::fmt::Debug for Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Signer(..)")
    }
}

/// Compute an HMAC-SHA256 signature and return it as a lowercase hex string.
pub fn hmac_sha256_sign(secret: &str, message: &str) -> Result<String, MxError> {
    Ok(Signer::new(secret)?.sign(message))
}

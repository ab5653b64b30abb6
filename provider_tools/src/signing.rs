use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;

use crate::ProviderApiError;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of the compact JSON serialisation of `payload`.
///
/// Requests without a body are signed over an empty object.
pub fn sign_payload(secret: &str, payload: Option<&Value>) -> Result<String, ProviderApiError> {
    let message = match payload {
        Some(v) => serde_json::to_string(v).map_err(|e| ProviderApiError::JsonError(e.to_string()))?,
        None => "{}".to_string(),
    };
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ProviderApiError::Initialization(format!("Invalid signing key. {e}")))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// The value of the `Authorization` header for a request carrying `payload`.
pub fn authorization_header(api_key: &str, secret: &str, payload: Option<&Value>) -> Result<String, ProviderApiError> {
    let signature = sign_payload(secret, payload)?;
    Ok(format!("HMAC {api_key}:{signature}"))
}

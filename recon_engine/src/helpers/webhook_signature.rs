//! # Webhook signature verification
//!
//! The payment-order provider signs every webhook call with HMAC-SHA256, keyed with the shared API secret, over the
//! exact bytes of the request body. The signature arrives in a request header. Providers are not consistent about
//! how the digest is encoded, so any of the following forms are accepted:
//!
//! * lowercase hex: `9f86d081...`
//! * base64: `n4bQgYhM...=`
//! * either of the above with a `sha256=` prefix.
//!
//! Every candidate encoding is compared, in constant time, against the supplied header value. Both sides are padded
//! to the same length before comparison and the results are combined without short-circuiting, so the time taken does
//! not depend on which (if any) candidate matched.
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SHA256_PREFIX: &str = "sha256=";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No webhook signing secret has been configured")]
    MissingSecret,
    #[error("The webhook signing secret cannot be used as an HMAC key")]
    InvalidSecret,
    #[error("No signature was provided with the request")]
    MissingSignature,
    #[error("The signature does not match the request body")]
    Mismatch,
}

impl SignatureError {
    /// True if the failure is caused by server configuration rather than by the caller.
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::MissingSecret | Self::InvalidSecret)
    }
}

/// Calculates the raw HMAC-SHA256 digest of `data` keyed with `secret`.
pub fn calculate_hmac(secret: &str, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidSecret)?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Produces the lowercase hex signature for `data`. This is the form the provider uses by default.
pub fn sign_hex(secret: &str, data: &[u8]) -> Result<String, SignatureError> {
    calculate_hmac(secret, data).map(hex::encode)
}

/// Checks `signature` against the HMAC of `data`, distinguishing between the reasons a check can fail.
pub fn check_signature(data: &[u8], signature: Option<&str>, secret: &str) -> Result<(), SignatureError> {
    if secret.is_empty() {
        return Err(SignatureError::MissingSecret);
    }
    let provided = signature.map(str::trim).filter(|s| !s.is_empty()).ok_or(SignatureError::MissingSignature)?;
    let digest = calculate_hmac(secret, data)?;
    let hex_digest = hex::encode(&digest);
    let b64_digest = base64::encode(&digest);
    let candidates = [
        hex_digest.clone(),
        format!("{SHA256_PREFIX}{hex_digest}"),
        b64_digest.clone(),
        format!("{SHA256_PREFIX}{b64_digest}"),
    ];
    let matched = candidates
        .iter()
        .fold(Choice::from(0u8), |acc, candidate| acc | padded_ct_eq(candidate.as_bytes(), provided.as_bytes()));
    if bool::from(matched) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Returns true if `signature` is a valid signature of `data` using `secret`. A missing secret or signature is never
/// valid.
pub fn verify(data: &[u8], signature: Option<&str>, secret: &str) -> bool {
    check_signature(data, signature, secret).is_ok()
}

/// Compares two byte strings in constant time with respect to their contents. The shorter one is zero-padded so that
/// the same number of bytes are always compared, and the lengths are compared separately.
fn padded_ct_eq(a: &[u8], b: &[u8]) -> Choice {
    let len = a.len().max(b.len());
    let mut left = vec![0u8; len];
    let mut right = vec![0u8; len];
    left[..a.len()].copy_from_slice(a);
    right[..b.len()].copy_from_slice(b);
    let same_len = (a.len() as u64).ct_eq(&(b.len() as u64));
    left.as_slice().ct_eq(right.as_slice()) & same_len
}

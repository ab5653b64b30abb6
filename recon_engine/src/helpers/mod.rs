mod status_normalizer;
mod transition_rules;
mod webhook_signature;

pub use status_normalizer::{normalize, NormalizedStatus, NEEDS_REVIEW};
pub use transition_rules::{decide, ObservationOutcome};
pub use webhook_signature::{calculate_hmac, check_signature, sign_hex, verify, SignatureError};

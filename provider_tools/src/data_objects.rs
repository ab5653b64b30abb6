use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Every provider response is wrapped in this envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderResponse<T> {
    pub status: String,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ProviderResponse<T> {
    pub fn is_success(&self) -> bool {
        self.status.eq_ignore_ascii_case("success")
    }
}

/// The provider's view of a payment order.
///
/// Only the fields the reconciliation engine relies on are typed. The full record is kept in `raw` so that it can be
/// stored in the audit trail.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrder {
    pub id: String,
    pub status: String,
    pub amount: Option<String>,
    pub token: Option<String>,
    pub network: Option<String>,
    pub tx_hash: Option<String>,
    pub raw: Value,
}

impl<'de> Deserialize<'de> for PaymentOrder {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where D: serde::Deserializer<'de> {
        use serde::de::Error;
        let raw = Value::deserialize(deserializer)?;
        let text = |key: &str| match &raw[key] {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        };
        let id = text("id").ok_or_else(|| D::Error::missing_field("id"))?;
        let status = text("status").ok_or_else(|| D::Error::missing_field("status"))?;
        Ok(Self {
            id,
            status,
            amount: text("amount"),
            token: text("token"),
            network: text("network"),
            tx_hash: text("txHash"),
            raw,
        })
    }
}

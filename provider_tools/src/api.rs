use std::{sync::Arc, time::Duration};

use log::*;
use rand::Rng;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
    Url,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::ProviderConfig,
    data_objects::{PaymentOrder, ProviderResponse},
    signing::authorization_header,
    ProviderApiError,
};

const BASE_BACKOFF_MS: u64 = 250;
const MAX_BACKOFF_MS: u64 = 5_000;

#[derive(Clone)]
pub struct ProviderApi {
    config: ProviderConfig,
    client: Arc<Client>,
}

impl ProviderApi {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderApiError> {
        let mut headers = HeaderMap::with_capacity(3);
        let val = HeaderValue::from_str(config.api_key.reveal().as_str())
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        headers.insert("API-Key", val);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        headers.insert("Content-Type", HeaderValue::from_static("application/json; charset=UTF-8"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProviderApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Sends a single signed request to the path made up of `segments`. Non-2xx responses are returned as
    /// [`ProviderApiError::QueryError`].
    pub async fn rest_query<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<T, ProviderApiError> {
        let url = self.url(segments)?;
        trace!("Sending REST query: {method} {url}");
        let auth = authorization_header(self.config.api_key.reveal(), self.config.api_secret.reveal(), body)?;
        let mut req = self.client.request(method, url).header("Authorization", auth);
        if let Some(body) = body {
            req = req.json(body);
        }
        let response = req.send().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ProviderApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ProviderApiError::RestResponseError(e.to_string()))?;
            Err(ProviderApiError::QueryError { status, message })
        }
    }

    /// Like [`Self::rest_query`], but retries transport failures and server errors with exponential backoff.
    ///
    /// Only use this for idempotent requests.
    pub async fn rest_query_with_retry<T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&Value>,
    ) -> Result<T, ProviderApiError> {
        let mut attempt = 0;
        loop {
            match self.rest_query(method.clone(), segments, body).await {
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt);
                    attempt += 1;
                    debug!("Request to /{} failed ({e}). Retry {attempt} in {}ms", segments.join("/"), delay.as_millis());
                    tokio::time::sleep(delay).await;
                },
                result => return result,
            }
        }
    }

    /// Appends `segments` to the base URL. Every segment is percent-encoded, so none of them can add path levels or a
    /// query string.
    pub fn url(&self, segments: &[&str]) -> Result<Url, ProviderApiError> {
        let base = &self.config.base_url;
        let mut url =
            Url::parse(base).map_err(|e| ProviderApiError::Initialization(format!("Invalid provider URL {base}. {e}")))?;
        url.path_segments_mut()
            .map_err(|_| ProviderApiError::Initialization(format!("{base} cannot be used as a base URL")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Fetches the provider's current record for the given payment order.
    ///
    /// Order ids are alphanumeric, with `-` and `_`. Anything else is refused without contacting the provider.
    pub async fn fetch_order(&self, order_id: &str) -> Result<PaymentOrder, ProviderApiError> {
        if !is_valid_order_id(order_id) {
            warn!("Refusing to fetch order with an invalid id: {order_id:?}");
            return Err(ProviderApiError::InvalidOrderId(order_id.to_string()));
        }
        debug!("Fetching payment order {order_id}");
        let response = self
            .rest_query_with_retry::<ProviderResponse<PaymentOrder>>(Method::GET, &["sender", "orders", order_id], None)
            .await?;
        if !response.is_success() {
            return Err(ProviderApiError::Rejected(response.message));
        }
        let order = response.data.ok_or(ProviderApiError::EmptyResponse)?;
        info!("Fetched payment order {order_id}. Provider status: {}", order.status);
        Ok(order)
    }
}

fn is_valid_order_id(order_id: &str) -> bool {
    !order_id.is_empty() && order_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn backoff_delay(attempt: u32) -> Duration {
    let exp = BASE_BACKOFF_MS.saturating_mul(1 << attempt.min(16));
    let jitter = rand::thread_rng().gen_range(0..=BASE_BACKOFF_MS / 2);
    Duration::from_millis(exp.min(MAX_BACKOFF_MS) + jitter)
}

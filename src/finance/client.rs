use crate::config::BackendConfig;
use crate::finance::backend::{Caller, FinanceBackend};
use crate::finance::error::{extract_error_message, FinanceError, FinanceResult};
use crate::finance::types::{
    ApiEnvelope, InitiatePaymentRequest, PageRequest, Paginated, PaymentTransaction, Transaction,
    ValidatePaymentRequest, Wallet,
};
use crate::gateway::form::PaymentFormData;
use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed client for the finance REST API.
///
/// Every call carries an explicit timeout. Only GET lookups are retried; the
/// initiate and validate POSTs are sent exactly once per call.
#[derive(Clone)]
pub struct HttpFinanceBackend {
    client: Client,
    base_url: String,
    service_token: Option<String>,
    timeout: Duration,
    max_retries: u32,
}

impl HttpFinanceBackend {
    pub fn new(config: &BackendConfig) -> FinanceResult<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| FinanceError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            service_token: config.api_token.clone(),
            timeout,
            max_retries: config.max_retries,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn callback_url(&self, txn_id: &str, status: Option<&str>) -> FinanceResult<String> {
        let mut params = vec![("txn_id", txn_id)];
        if let Some(status) = status {
            params.push(("status", status));
        }
        Url::parse_with_params(&self.endpoint("/api/finance/payment/callback/"), &params)
            .map(String::from)
            .map_err(|e| FinanceError::validation(format!("invalid callback URL: {}", e), None))
    }

    fn user_segment(caller: &Caller) -> FinanceResult<&str> {
        let user_id = caller.user_id.trim();
        if user_id.is_empty() {
            return Err(FinanceError::validation("user id is required", Some("user_id")));
        }
        if !is_path_safe_user_id(user_id) {
            return Err(FinanceError::validation("user id is not valid", Some("user_id")));
        }
        Ok(user_id)
    }

    /// `{base}/{head..}/{user_id}/{tail..}` with the user id as one encoded segment.
    fn user_url(&self, head: &[&str], user_id: &str, tail: &[&str]) -> FinanceResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| FinanceError::validation(format!("invalid base URL: {}", e), None))?;
        url.path_segments_mut()
            .map_err(|_| FinanceError::validation("base URL cannot carry a path", None))?
            .pop_if_empty()
            .extend(head)
            .push(user_id)
            .extend(tail);
        Ok(url)
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        caller: &Caller,
        body: Option<&JsonValue>,
    ) -> FinanceResult<T> {
        let retries = if method == Method::GET {
            self.max_retries
        } else {
            0
        };
        let token = caller
            .bearer_token
            .as_deref()
            .or(self.service_token.as_deref());

        let mut last_error = None;
        for attempt in 0..=retries {
            let mut request = self.client.request(method.clone(), url);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            debug!(method = %method, url = %url, attempt = attempt + 1, "finance API request");
            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let message = if e.is_timeout() {
                        format!("request timed out after {}s", self.timeout.as_secs())
                    } else {
                        e.to_string()
                    };
                    last_error = Some(FinanceError::Network { message });
                    if attempt < retries {
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    break;
                }
            };

            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            if status.is_success() {
                return serde_json::from_str::<T>(&text).map_err(|e| {
                    FinanceError::InvalidResponse {
                        message: format!("could not decode response from {}: {}", url, e),
                    }
                });
            }

            if status.is_server_error() && attempt < retries {
                warn!(status = %status, attempt = attempt + 1, "finance API server error, retrying");
                tokio::time::sleep(retry_backoff(attempt)).await;
                continue;
            }

            let message = serde_json::from_str::<JsonValue>(&text)
                .ok()
                .and_then(|body| extract_error_message(&body))
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            return Err(FinanceError::Application {
                message,
                status: Some(status.as_u16()),
            });
        }

        Err(last_error.unwrap_or(FinanceError::Network {
            message: "finance API request failed".to_string(),
        }))
    }
}

/// A user id must stay a single path segment.
pub fn is_path_safe_user_id(user_id: &str) -> bool {
    !matches!(user_id, "." | "..")
        && !user_id
            .chars()
            .any(|c| matches!(c, '/' | '\\' | '?' | '#' | '%') || c.is_control())
}

/// 250 ms doubling per attempt, capped at 8 s.
fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(250u64 << attempt.min(5))
}

fn to_json<T: serde::Serialize>(value: &T) -> FinanceResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| FinanceError::InvalidResponse {
        message: format!("could not encode request body: {}", e),
    })
}

#[async_trait]
impl FinanceBackend for HttpFinanceBackend {
    async fn initiate_payment(
        &self,
        caller: &Caller,
        request: InitiatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentFormData>> {
        let body = to_json(&request)?;
        self.request_json(
            Method::POST,
            &self.endpoint("/api/finance/payment/initiate/"),
            caller,
            Some(&body),
        )
        .await
    }

    async fn validate_payment(
        &self,
        caller: &Caller,
        request: ValidatePaymentRequest,
    ) -> FinanceResult<ApiEnvelope<PaymentTransaction>> {
        let body = to_json(&request)?;
        self.request_json(
            Method::POST,
            &self.endpoint("/api/finance/payment/validate/"),
            caller,
            Some(&body),
        )
        .await
    }

    async fn payment_callback(
        &self,
        caller: &Caller,
        txn_id: &str,
        status: Option<&str>,
    ) -> FinanceResult<ApiEnvelope<JsonValue>> {
        let url = self.callback_url(txn_id, status)?;
        self.request_json(Method::GET, &url, caller, None).await
    }

    async fn wallet_for_user(&self, caller: &Caller) -> FinanceResult<ApiEnvelope<Wallet>> {
        let user_id = Self::user_segment(caller)?;
        let url = self.user_url(&["api", "finance", "wallet", "user"], user_id, &[""])?;
        self.request_json(Method::GET, url.as_str(), caller, None)
            .await
    }

    async fn user_transactions(
        &self,
        caller: &Caller,
        page: PageRequest,
    ) -> FinanceResult<Paginated<Transaction>> {
        let user_id = Self::user_segment(caller)?;
        let mut url = self.user_url(
            &["api", "finance", "transaction", "user"],
            user_id,
            &["transactions"],
        )?;
        url.query_pairs_mut()
            .append_pair("page", &page.page.to_string())
            .append_pair("page_size", &page.page_size.to_string());
        self.request_json(Method::GET, url.as_str(), caller, None)
            .await
    }
}

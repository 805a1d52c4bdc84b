//! HTTP chain gateway.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tracing::debug;

use minthub_core::defaults::{CHAIN_RPC_URL, CHAIN_SUBMIT_TIMEOUT_SECS};
use minthub_core::{ChainGateway, ChainTransaction, Error, Result, SubmitReceipt};

/// [`ChainGateway`] that posts call descriptions to a signer node.
///
/// The node owns encoding, signing, and submission; this side only
/// describes the calls and reads back the digest. Any transport or
/// non-success response is an `Error::Chain`, the transient class the
/// executor's retry policy acts on.
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    signer_address: Option<String>,
    timeout_secs: u64,
}

impl HttpGateway {
    /// Create a gateway against the given node URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            signer_address: None,
            timeout_secs: CHAIN_SUBMIT_TIMEOUT_SECS,
        }
    }

    /// Create a gateway from `MINTHUB_RPC_URL` / `MINTHUB_SIGNER_ADDRESS`.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("MINTHUB_RPC_URL").unwrap_or_else(|_| CHAIN_RPC_URL.to_string());
        let mut gateway = Self::new(base_url);
        if let Ok(signer) = std::env::var("MINTHUB_SIGNER_ADDRESS") {
            if !signer.is_empty() {
                gateway.signer_address = Some(signer);
            }
        }
        gateway
    }

    /// Set the sending address attached to submissions.
    pub fn with_signer(mut self, signer_address: impl Into<String>) -> Self {
        self.signer_address = Some(signer_address.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

#[async_trait]
impl ChainGateway for HttpGateway {
    async fn submit(&self, txn: ChainTransaction, label: &str) -> Result<SubmitReceipt> {
        let url = format!("{}/v1/transactions", self.base_url.trim_end_matches('/'));
        let body = json!({
            "label": label,
            "sender": self.signer_address,
            "transaction": txn,
        });

        debug!(
            subsystem = "gateway",
            component = "http_gateway",
            op = "submit",
            call_count = txn.calls.len(),
            label,
            "Submitting transaction"
        );

        let response = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.timeout_secs))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::Chain(format!("node returned {status}: {detail}")));
        }

        let value: JsonValue = response.json().await?;
        let digest = value
            .get("digest")
            .and_then(|digest| digest.as_str())
            .ok_or_else(|| Error::Chain("node response missing digest".into()))?
            .to_string();

        Ok(SubmitReceipt {
            digest,
            effects: value.get("effects").filter(|e| !e.is_null()).cloned(),
            label: label.to_string(),
        })
    }
}

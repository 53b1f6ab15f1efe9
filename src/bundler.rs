use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::data::{JsonRpcRequest, JsonRpcResponse};
use crate::error::TrackerError;

const NOT_FOUND_MESSAGE: &str = "user operation not found";

/// What the bundler knows about a user operation.
#[derive(Debug)]
pub enum LookupOutcome {
    /// Mined; carries the hash of the bundle transaction.
    Success { transaction_hash: String },
    /// The bundler answered but has no mined transaction for it yet.
    Error { code: Option<i64>, message: String },
    /// The bundler could not be asked.
    Unavailable(TrackerError),
}

/// Answers "has this user operation been mined yet".
#[async_trait]
pub trait ConfirmationClient: Send + Sync {
    async fn lookup(&self, operation_id: &str, chain: &str) -> LookupOutcome;
}

/// JSON-RPC client for `eth_getUserOperationByHash`, one endpoint per chain
/// under a common base url.
#[derive(Debug, Clone)]
pub struct BundlerClient {
    http: Client,
    base: Url,
}

impl BundlerClient {
    pub fn new(base: Url, timeout: Duration) -> Result<Self, TrackerError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(BundlerClient { http, base })
    }

    /// The base url with `chain` appended as one escaped path segment.
    pub fn endpoint(&self, chain: &str) -> Result<Url, TrackerError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| TrackerError::Url(format!("{} cannot be a base", self.base)))?
            .pop_if_empty()
            .push(chain);
        Ok(url)
    }

    async fn fetch(&self, operation_id: &str, chain: &str) -> Result<JsonRpcResponse, TrackerError> {
        let url = self.endpoint(chain)?;
        debug!(%url, operation_id, "Querying bundler");
        let response = self
            .http
            .post(url)
            .json(&JsonRpcRequest::user_operation_by_hash(operation_id))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Http {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| TrackerError::Decode(e.to_string()))
    }
}

#[async_trait]
impl ConfirmationClient for BundlerClient {
    async fn lookup(&self, operation_id: &str, chain: &str) -> LookupOutcome {
        match self.fetch(operation_id, chain).await {
            Ok(response) => interpret(response),
            Err(err) => LookupOutcome::Unavailable(err),
        }
    }
}

/// Maps a JSON-RPC envelope onto a lookup outcome.
///
/// A `null` result means the bundler does not know the operation (yet), which
/// is reported the same way as an explicit error.
pub fn interpret(response: JsonRpcResponse) -> LookupOutcome {
    if let Some(transaction_hash) = response
        .result
        .and_then(|result| result.transaction_hash)
        .filter(|hash| !hash.is_empty())
    {
        return LookupOutcome::Success { transaction_hash };
    }
    match response.error {
        Some(error) => LookupOutcome::Error {
            code: error.code,
            message: error.message,
        },
        None => LookupOutcome::Error {
            code: None,
            message: NOT_FOUND_MESSAGE.to_string(),
        },
    }
}

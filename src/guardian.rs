use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::data::TransactionUpdate;
use crate::error::TrackerError;

/// Tells the downstream bookkeeping service that an operation landed.
#[async_trait]
pub trait FinalizationNotifier: Send + Sync {
    async fn notify(&self, transaction_hash: &str, chain: &str) -> Result<(), TrackerError>;
}

#[derive(Debug, Clone)]
pub struct GuardianClient {
    http: Client,
    endpoint: Url,
}

impl GuardianClient {
    pub fn new(endpoint: Url, timeout: Duration) -> Result<Self, TrackerError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(GuardianClient { http, endpoint })
    }
}

#[async_trait]
impl FinalizationNotifier for GuardianClient {
    async fn notify(&self, transaction_hash: &str, chain: &str) -> Result<(), TrackerError> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&TransactionUpdate {
                transaction_hash,
                chain,
            })
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::Http {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        info!(transaction_hash, chain, response = %body, "Guardian updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{spawn_server, url_for};
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn posts_hash_and_chain() {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
        let recorded = seen.clone();
        let app = Router::new().route(
            "/guardian/update/txn/",
            post(move |Json(body): Json<Value>| {
                let recorded = recorded.clone();
                async move {
                    recorded.lock().unwrap().push(body);
                    Json(json!({"ok": true}))
                }
            }),
        );
        let addr = spawn_server(app).await;
        let guardian =
            GuardianClient::new(url_for(addr, "/guardian/update/txn/"), Duration::from_secs(5)).unwrap();

        guardian.notify("0xdef", "eth").await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"transaction_hash": "0xdef", "chain": "eth"})]
        );
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let app = Router::new().route(
            "/guardian/update/txn/",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let addr = spawn_server(app).await;
        let guardian =
            GuardianClient::new(url_for(addr, "/guardian/update/txn/"), Duration::from_secs(5)).unwrap();

        let err = guardian.notify("0xdef", "eth").await.unwrap_err();
        assert!(matches!(err, TrackerError::Http { status: 500 }));
    }
}

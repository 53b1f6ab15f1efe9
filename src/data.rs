use serde::{Deserialize, Serialize};
use tokio::time::Instant;

pub const JSONRPC_VERSION: &str = "2.0";
pub const GET_USER_OPERATION_BY_HASH: &str = "eth_getUserOperationByHash";

// Identifies a tracked operation for rate gating.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub operation_id: String,
    pub chain: String,
}

/// A user operation waiting to be seen in a mined transaction.
///
/// `enqueued_at` is captured once at submission and carried unchanged through
/// every requeue; expiry is measured from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingItem {
    pub operation_id: String,
    pub chain: String,
    pub enqueued_at: Instant,
}

impl PendingItem {
    pub fn new(operation_id: impl Into<String>, chain: impl Into<String>) -> Self {
        Self::at(operation_id, chain, Instant::now())
    }

    pub fn at(
        operation_id: impl Into<String>,
        chain: impl Into<String>,
        enqueued_at: Instant,
    ) -> Self {
        PendingItem {
            operation_id: operation_id.into(),
            chain: chain.into(),
            enqueued_at,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            operation_id: self.operation_id.clone(),
            chain: self.chain.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: [&'a str; 1],
}

impl<'a> JsonRpcRequest<'a> {
    pub fn user_operation_by_hash(operation_id: &'a str) -> Self {
        JsonRpcRequest {
            jsonrpc: JSONRPC_VERSION,
            id: 1,
            method: GET_USER_OPERATION_BY_HASH,
            params: [operation_id],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Option<UserOperationLookup>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

// Only the field we act on; bundlers return much more.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationLookup {
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

/// Body accepted by the trigger endpoint.
///
/// Fields are kept as raw JSON so that a null or non-string value reads as
/// missing instead of failing the whole body.
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    #[serde(default)]
    pub user_operation_hash: Option<serde_json::Value>,
    #[serde(default)]
    pub chain: Option<serde_json::Value>,
}

impl TriggerRequest {
    /// Reads the known fields out of any JSON value; anything but an object
    /// yields an empty request.
    pub fn from_json(body: serde_json::Value) -> Self {
        serde_json::from_value(body).unwrap_or_default()
    }

    pub fn user_operation_hash(&self) -> Option<&str> {
        self.user_operation_hash.as_ref().and_then(|v| v.as_str())
    }

    pub fn chain(&self) -> Option<&str> {
        self.chain.as_ref().and_then(|v| v.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

impl TriggerResponse {
    pub fn queued() -> Self {
        TriggerResponse {
            success: true,
            status: Some("added to queue".to_string()),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        TriggerResponse {
            success: false,
            status: None,
            error: Some(error.into()),
        }
    }
}

// Sent to the guardian once the mined transaction is known.
#[derive(Debug, Serialize)]
pub struct TransactionUpdate<'a> {
    pub transaction_hash: &'a str,
    pub chain: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_request_shape() {
        let body = serde_json::to_value(JsonRpcRequest::user_operation_by_hash("0xabc")).unwrap();
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "eth_getUserOperationByHash",
                "params": ["0xabc"],
            })
        );
    }

    #[test]
    fn response_with_result_or_error() {
        let mined: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"transactionHash": "0xdef", "entryPoint": "0x0"},
        }))
        .unwrap();
        assert_eq!(
            mined.result.and_then(|r| r.transaction_hash).as_deref(),
            Some("0xdef")
        );

        let failed: JsonRpcResponse =
            serde_json::from_value(json!({"error": {"code": -32601, "message": "not found"}})).unwrap();
        assert!(failed.result.is_none());
        assert_eq!(
            failed.error,
            Some(JsonRpcError {
                code: Some(-32601),
                message: "not found".into()
            })
        );

        let pending: JsonRpcResponse = serde_json::from_value(json!({"result": null})).unwrap();
        assert!(pending.result.is_none() && pending.error.is_none());
    }

    #[test]
    fn trigger_request_ignores_non_string_fields() {
        let request = TriggerRequest::from_json(json!({"user_operation_hash": 123, "chain": "eth"}));
        assert_eq!(request.user_operation_hash(), None);
        assert_eq!(request.chain(), Some("eth"));

        let request = TriggerRequest::from_json(json!({"user_operation_hash": null, "chain": ["eth"]}));
        assert_eq!((request.user_operation_hash(), request.chain()), (None, None));

        let request = TriggerRequest::from_json(json!(["0xabc", "eth"]));
        assert_eq!((request.user_operation_hash(), request.chain()), (None, None));
    }

    #[test]
    fn trigger_response_omits_empty_fields() {
        assert_eq!(
            serde_json::to_value(TriggerResponse::queued()).unwrap(),
            json!({"success": true, "status": "added to queue"})
        );
        assert_eq!(
            serde_json::to_value(TriggerResponse::rejected("nope")).unwrap(),
            json!({"success": false, "error": "nope"})
        );
    }

    #[test]
    fn update_body_uses_snake_case() {
        let body = serde_json::to_value(TransactionUpdate {
            transaction_hash: "0xdef",
            chain: "eth",
        })
        .unwrap();
        assert_eq!(body, json!({"transaction_hash": "0xdef", "chain": "eth"}));
    }
}

use serde::Deserialize;
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Error member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcErrorObject {
    pub code: i64,
    pub message: String,
}

impl RpcErrorObject {
    /// Servers are not always strict about the error shape, so accept a bare string too.
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Self {
                code: map.get("code").and_then(Value::as_i64).unwrap_or(-32000),
                message: map
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            },
            Value::String(message) => Self {
                code: -32000,
                message: message.clone(),
            },
            other => Self {
                code: -32000,
                message: other.to_string(),
            },
        }
    }
}

/// A decoded inbound message carrying a correlation id.
///
/// Either a response to one of our requests (`result` / `error`) or a request the
/// server initiated (`method`).
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Value,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl JsonRpcMessage {
    pub fn has_correlation_id(&self) -> bool {
        matches!(self.id, Value::Number(_) | Value::String(_))
    }

    pub fn is_server_request(&self) -> bool {
        self.method.is_some()
    }

    /// Numeric id, also accepting ids echoed back as strings.
    pub fn numeric_id(&self) -> Option<u64> {
        match &self.id {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    pub fn rpc_error(&self) -> Option<RpcErrorObject> {
        self.error
            .as_ref()
            .filter(|value| !value.is_null())
            .map(RpcErrorObject::from_value)
    }

    pub fn into_result(self) -> Result<Value, RpcErrorObject> {
        if let Some(error) = self.rpc_error() {
            return Err(error);
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

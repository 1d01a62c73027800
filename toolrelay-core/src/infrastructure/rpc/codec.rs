use super::error::CodecError;
use super::types::{JSONRPC_VERSION, JsonRpcMessage};
use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};
use tracing::debug;

const CONTENT_LENGTH: &str = "content-length:";

/// Build a request (with `id`) or notification (without) as one newline-terminated line.
///
/// `params` is omitted when null or an empty object.
pub fn encode_message(method: &str, params: &Value, id: Option<u64>) -> Result<Vec<u8>, CodecError> {
    let mut message = Map::new();
    message.insert("jsonrpc".to_string(), Value::from(JSONRPC_VERSION));
    message.insert("method".to_string(), Value::from(method));
    if !is_empty_params(params) {
        message.insert("params".to_string(), params.clone());
    }
    if let Some(id) = id {
        message.insert("id".to_string(), Value::from(id));
    }
    to_line(&Value::Object(message))
}

/// Reply to a server-initiated request.
pub fn encode_response(id: Value, result: Value) -> Result<Vec<u8>, CodecError> {
    to_line(&json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "result": result,
    }))
}

pub fn encode_error(id: Value, code: i64, message: &str) -> Result<Vec<u8>, CodecError> {
    to_line(&json!({
        "jsonrpc": JSONRPC_VERSION,
        "id": id,
        "error": { "code": code, "message": message },
    }))
}

fn to_line(value: &Value) -> Result<Vec<u8>, CodecError> {
    let mut bytes = serde_json::to_vec(value).map_err(CodecError::Encode)?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn is_empty_params(params: &Value) -> bool {
    match params {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Read the next message that carries a correlation id.
///
/// Accepts newline-delimited JSON as well as `Content-Length` framed bodies. Id-less
/// messages (notifications) and non-JSON lines (startup banners, npm noise) are
/// skipped. Gives up with [`CodecError::NoResponse`] after `max_lines` lines.
pub async fn decode_one<R>(reader: &mut R, max_lines: usize) -> Result<JsonRpcMessage, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut pending_length: Option<usize> = None;
    let mut buffer = Vec::new();

    for _ in 0..max_lines {
        buffer.clear();
        let read = reader.read_until(b'\n', &mut buffer).await?;
        if read == 0 {
            return Err(CodecError::Eof);
        }

        let line = String::from_utf8_lossy(&buffer);
        let line = line.trim();

        if line.is_empty() {
            if let Some(length) = pending_length.take() {
                let mut body = vec![0u8; length];
                reader.read_exact(&mut body).await?;
                let value: Value = serde_json::from_slice(&body).map_err(CodecError::InvalidBody)?;
                if let Some(message) = correlated(value) {
                    return Ok(message);
                }
            }
            continue;
        }

        if let Some(length) = content_length(line) {
            pending_length = Some(length);
            continue;
        }

        if pending_length.is_some() {
            // Remaining header lines (Content-Type and friends) until the blank separator.
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                if let Some(message) = correlated(value) {
                    return Ok(message);
                }
            }
            Err(_) => {
                debug!(line, "discarding non-JSON line from server");
            }
        }
    }

    Err(CodecError::NoResponse { scanned: max_lines })
}

fn content_length(line: &str) -> Option<usize> {
    let lower = line.to_ascii_lowercase();
    let rest = lower.strip_prefix(CONTENT_LENGTH)?;
    match rest.trim().parse() {
        Ok(0) => {
            debug!(line, "ignoring empty Content-Length frame");
            None
        }
        Ok(length) => Some(length),
        Err(_) => {
            debug!(line, "ignoring malformed Content-Length header");
            None
        }
    }
}

fn correlated(value: Value) -> Option<JsonRpcMessage> {
    if !value.is_object() {
        return None;
    }
    let message: JsonRpcMessage = serde_json::from_value(value).ok()?;
    if message.has_correlation_id() {
        Some(message)
    } else {
        debug!(method = ?message.method, "skipping notification");
        None
    }
}

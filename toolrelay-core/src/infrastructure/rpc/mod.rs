//! JSON-RPC 2.0 over stdio
//!
//! Stateless encode/decode helpers shared by every server connection. Messages are
//! written newline-delimited; both newline-delimited and `Content-Length` framed
//! messages are accepted on read.

mod codec;
mod error;
mod types;

pub use codec::{decode_one, encode_error, encode_message, encode_response};
pub use error::CodecError;
pub use types::{JSONRPC_VERSION, JsonRpcMessage, RpcErrorObject};

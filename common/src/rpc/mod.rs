#[cfg(feature = "rpc-server")]
pub mod server;

mod error;
mod rpc_handler;

pub use error::*;
pub use rpc_handler::*;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSON_RPC_VERSION: &str = "2.0";

// Maximum number of requests accepted in a single JSON-RPC batch
pub const MAX_BATCH_REQUESTS: usize = 20;

/// JSON-RPC request id: string or number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Id {
    String(String),
    Number(u64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub id: Option<Id>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

// Plutus — Wallet JSON-RPC Protocol Types
//
// The wallet node speaks bitcoind-flavoured JSON-RPC 1.0: requests carry
// `jsonrpc: "1.0"`, responses always carry both `result` and `error`,
// one of which is null.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request sent to the wallet node.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    pub params: Vec<Value>,
}

/// A JSON-RPC response from the wallet node.
#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
    #[serde(default)]
    pub id: Value,
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

/// Returned by `walletpassphrase` when the passphrase does not unlock the wallet.
pub const WALLET_PASSPHRASE_INCORRECT: i32 = -14;

impl<'a> JsonRpcRequest<'a> {
    pub fn new(id: u64, method: &'a str, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: "1.0",
            id,
            method,
            params,
        }
    }
}

impl JsonRpcResponse {
    /// Split into the result value or the node's error object.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.result),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

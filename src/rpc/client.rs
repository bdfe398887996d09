// Plutus — Wallet Node RPC Client
//
// `WalletRpc` is the seam between the gateway and the wallet node. The
// production implementation speaks JSON-RPC over HTTP with basic auth and
// a client-side timeout; the node performs address decoding, balance
// queries, transaction construction/broadcast and multisig script
// generation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use zeroize::Zeroizing;

use super::protocol::{JsonRpcRequest, JsonRpcResponse};
use super::RpcError;

/// Address and redeem script returned by `createmultisig`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigAddress {
    pub address: String,
    #[serde(rename = "redeemScript")]
    pub redeem_script: String,
}

/// Operations the gateway needs from the wallet node.
#[async_trait]
pub trait WalletRpc: Send + Sync {
    /// Derive an `n`-of-`keys.len()` multisig address from hex public keys.
    async fn create_multisig(&self, required: u32, keys: &[String]) -> Result<MultisigAddress, RpcError>;

    async fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u64) -> Result<(), RpcError>;

    /// Balance in BTC. `"*"` sums every account.
    async fn get_balance(&self, account: &str) -> Result<f64, RpcError>;

    async fn list_transactions(&self, account: &str) -> Result<Value, RpcError>;

    async fn send_to_address(&self, address: &str, amount: f64) -> Result<String, RpcError>;

    async fn send_from(&self, account: &str, address: &str, amount: f64) -> Result<String, RpcError>;

    async fn send_many(&self, account: &str, amounts: &BTreeMap<String, f64>) -> Result<String, RpcError>;

    async fn move_funds(&self, from: &str, to: &str, amount: f64) -> Result<bool, RpcError>;

    async fn create_new_account(&self, label: &str) -> Result<(), RpcError>;

    async fn get_account_address(&self, label: &str) -> Result<String, RpcError>;
}

// ─── HTTP Implementation ────────────────────────────────────────────────────

pub struct HttpWalletRpc {
    client: reqwest::Client,
    url: String,
    user: String,
    password: Zeroizing<String>,
    next_id: AtomicU64,
}

impl HttpWalletRpc {
    pub fn new(
        url: impl Into<String>,
        user: impl Into<String>,
        password: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            user: user.into(),
            password,
            next_id: AtomicU64::new(1),
        })
    }

    async fn call_raw(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);

        tracing::debug!(method = %method, id, "Wallet RPC call");

        let mut builder = self.client.post(&self.url).json(&request);
        if !self.user.is_empty() {
            builder = builder.basic_auth(&self.user, Some(self.password.as_str()));
        }

        // bitcoind answers RPC errors with a non-2xx status and a JSON body,
        // so the body is decoded regardless of status.
        let response = builder.send().await?;
        let status = response.status();
        let body: JsonRpcResponse = response.json().await.map_err(|e| RpcError::Decode {
            method: method.to_string(),
            reason: format!("HTTP {}: {}", status, e),
        })?;

        // A null id is what the node sends when it could not parse the request.
        if !body.id.is_null() && body.id != Value::from(id) {
            return Err(RpcError::Decode {
                method: method.to_string(),
                reason: format!("response id {} does not match request id {}", body.id, id),
            });
        }

        body.into_result().map_err(|e| RpcError::Node {
            code: e.code,
            message: e.message,
        })
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Vec<Value>) -> Result<T, RpcError> {
        let value = self.call_raw(method, params).await?;
        serde_json::from_value(value).map_err(|e| RpcError::Decode {
            method: method.to_string(),
            reason: e.to_string(),
        })
    }
}

impl std::fmt::Debug for HttpWalletRpc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWalletRpc")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl WalletRpc for HttpWalletRpc {
    async fn create_multisig(&self, required: u32, keys: &[String]) -> Result<MultisigAddress, RpcError> {
        self.call("createmultisig", vec![json!(required), json!(keys)]).await
    }

    async fn wallet_passphrase(&self, passphrase: &str, timeout_secs: u64) -> Result<(), RpcError> {
        self.call_raw("walletpassphrase", vec![json!(passphrase), json!(timeout_secs)])
            .await?;
        Ok(())
    }

    async fn get_balance(&self, account: &str) -> Result<f64, RpcError> {
        self.call("getbalance", vec![json!(account)]).await
    }

    async fn list_transactions(&self, account: &str) -> Result<Value, RpcError> {
        self.call_raw("listtransactions", vec![json!(account)]).await
    }

    async fn send_to_address(&self, address: &str, amount: f64) -> Result<String, RpcError> {
        self.call("sendtoaddress", vec![json!(address), json!(amount)]).await
    }

    async fn send_from(&self, account: &str, address: &str, amount: f64) -> Result<String, RpcError> {
        self.call("sendfrom", vec![json!(account), json!(address), json!(amount)])
            .await
    }

    async fn send_many(&self, account: &str, amounts: &BTreeMap<String, f64>) -> Result<String, RpcError> {
        self.call("sendmany", vec![json!(account), json!(amounts)]).await
    }

    async fn move_funds(&self, from: &str, to: &str, amount: f64) -> Result<bool, RpcError> {
        self.call("move", vec![json!(from), json!(to), json!(amount)]).await
    }

    async fn create_new_account(&self, label: &str) -> Result<(), RpcError> {
        self.call_raw("createnewaccount", vec![json!(label)]).await?;
        Ok(())
    }

    async fn get_account_address(&self, label: &str) -> Result<String, RpcError> {
        self.call("getaccountaddress", vec![json!(label)]).await
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;

    /// A fake wallet node answering a fixed set of methods.
    async fn fake_node(Json(req): Json<Value>) -> (axum::http::StatusCode, Json<Value>) {
        let id = req["id"].clone();
        let method = req["method"].as_str().unwrap_or_default().to_string();
        let params = req["params"].clone();

        let ok = |result: Value| {
            (
                axum::http::StatusCode::OK,
                Json(json!({ "result": result, "error": null, "id": id.clone() })),
            )
        };

        match method.as_str() {
            "createmultisig" => ok(json!({
                "address": format!("addr-{}-of-{}", params[0], params[1].as_array().map(|a| a.len()).unwrap_or(0)),
                "redeemScript": "522102"
            })),
            "walletpassphrase" if params[0] == "correct horse" => ok(Value::Null),
            "walletpassphrase" => (
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "result": null,
                    "error": { "code": -14, "message": "The wallet passphrase entered was incorrect." },
                    "id": id.clone()
                })),
            ),
            "getbalance" => ok(json!(1.25)),
            "sendmany" => ok(json!(format!("txid-{}", params[1].as_object().map(|m| m.len()).unwrap_or(0)))),
            "getaccountaddress" => ok(json!("bc1qfreshaddress")),
            "listtransactions" => (
                axum::http::StatusCode::OK,
                Json(json!({ "result": [], "error": null, "id": 424242 })),
            ),
            _ => (
                axum::http::StatusCode::NOT_FOUND,
                Json(json!({
                    "result": null,
                    "error": { "code": -32601, "message": "Method not found" },
                    "id": id.clone()
                })),
            ),
        }
    }

    async fn spawn_fake_node() -> SocketAddr {
        let app = Router::new().route("/", post(fake_node));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn client() -> HttpWalletRpc {
        let addr = spawn_fake_node().await;
        HttpWalletRpc::new(
            format!("http://{}/", addr),
            "rpcuser",
            Zeroizing::new("rpcpass".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_multisig_decodes_redeem_script() {
        let rpc = client().await;
        let keys = vec!["02aa".to_string(), "03bb".to_string(), "02cc".to_string()];
        let result = rpc.create_multisig(2, &keys).await.unwrap();
        assert_eq!(result.address, "addr-2-of-3");
        assert_eq!(result.redeem_script, "522102");
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_recognised() {
        let rpc = client().await;
        assert!(rpc.wallet_passphrase("correct horse", 60).await.is_ok());

        let err = rpc.wallet_passphrase("wrong", 60).await.unwrap_err();
        assert!(err.is_wrong_passphrase(), "got {:?}", err);
    }

    #[tokio::test]
    async fn test_numeric_and_string_results() {
        let rpc = client().await;
        assert_eq!(rpc.get_balance("*").await.unwrap(), 1.25);
        assert_eq!(rpc.get_account_address("shop").await.unwrap(), "bc1qfreshaddress");

        let mut amounts = BTreeMap::new();
        amounts.insert("bc1qa".to_string(), 0.1);
        amounts.insert("bc1qb".to_string(), 0.2);
        assert_eq!(rpc.send_many("shop", &amounts).await.unwrap(), "txid-2");
    }

    #[tokio::test]
    async fn test_unknown_method_is_node_error() {
        let rpc = client().await;
        let err = rpc.create_new_account("shop").await.unwrap_err();
        assert!(matches!(err, RpcError::Node { code: -32601, .. }), "got {:?}", err);
        assert!(!err.is_wrong_passphrase());
    }

    #[tokio::test]
    async fn test_mismatched_response_id_is_rejected() {
        let rpc = client().await;
        let err = rpc.list_transactions("shop").await.unwrap_err();
        match err {
            RpcError::Decode { method, reason } => {
                assert_eq!(method, "listtransactions");
                assert!(reason.contains("424242"), "{}", reason);
            }
            other => panic!("expected Decode, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let rpc = HttpWalletRpc::new(
            "http://127.0.0.1:1/",
            "",
            Zeroizing::new(String::new()),
            Duration::from_secs(2),
        )
        .unwrap();
        let err = rpc.get_balance("*").await.unwrap_err();
        assert!(matches!(err, RpcError::Transport(_)), "got {:?}", err);
    }

    #[test]
    fn test_debug_redacts_password() {
        let rpc = HttpWalletRpc::new(
            "http://127.0.0.1:8332",
            "user",
            Zeroizing::new("hunter2".to_string()),
            Duration::from_secs(1),
        )
        .unwrap();
        let debug = format!("{:?}", rpc);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}

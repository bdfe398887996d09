// Plutus — HTTP request and response schemas
//
// Every body is an explicit struct. Missing string fields deserialize to
// empty and are rejected by the handler with the field name attached, so a
// caller always learns which field to fix.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SubmitPubKeyRequest {
    #[serde(rename = "accountID")]
    pub account_id: String,
    /// Hex SEC1 encoding, compressed or uncompressed.
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProvisionRequest {
    pub customer: String,
    pub vendor: String,
}

#[derive(Debug, Serialize)]
pub struct ProvisionResponse {
    pub address: String,
    #[serde(rename = "redeemScript")]
    pub redeem_script: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LabelRequest {
    pub label: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub destination: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendFromRequest {
    pub source: String,
    pub destination: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendManyRequest {
    pub source: String,
    pub destinations: BTreeMap<String, f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MoveRequest {
    pub source: String,
    pub destination: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// BTC, formatted with eight decimal places.
    pub balance: String,
}

#[derive(Debug, Serialize)]
pub struct TransactionsResponse {
    pub transactions: Value,
}

#[derive(Debug, Serialize)]
pub struct TxidResponse {
    pub txid: String,
}

#[derive(Debug, Serialize)]
pub struct AddressResponse {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

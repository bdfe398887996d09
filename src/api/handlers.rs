// Plutus — HTTP handlers
//
// Input is checked here, before anything reaches custody or the wallet node.
// Handlers for wallet pass-through routes only shape requests and responses.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use super::error::REQUEST_FAILED;
use super::types::*;
use super::{ApiError, AppState};
use crate::custody::MAX_ACCOUNT_ID_LEN;

/// Total BTC supply; no single amount can exceed it.
const MAX_AMOUNT_BTC: f64 = 21_000_000.0;

type Body<T> = Result<Json<T>, JsonRejection>;

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Custody ─────────────────────────────────────────────────────────────────

pub async fn submit_pubkey(
    State(state): State<Arc<AppState>>,
    body: Body<SubmitPubKeyRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let Json(req) = body?;
    if req.account_id.is_empty() {
        return Err(ApiError::missing_field("accountID"));
    }
    if req.public_key.is_empty() {
        return Err(ApiError::missing_field("publicKey"));
    }
    let key = hex::decode(req.public_key.trim())
        .map_err(|_| ApiError::bad_request("Invalid public key").with_field("publicKey"))?;

    state.registry.submit(&req.account_id, &key)?;
    Ok(Json(MessageResponse {
        message: "Key successfully inserted or updated",
    }))
}

pub async fn provision_escrow(
    State(state): State<Arc<AppState>>,
    body: Body<ProvisionRequest>,
) -> Result<Json<ProvisionResponse>, ApiError> {
    let Json(req) = body?;
    let wallet = state.provisioner.provision_escrow(&req.customer, &req.vendor).await?;
    Ok(Json(ProvisionResponse {
        address: wallet.address,
        redeem_script: wallet.redeem_script,
    }))
}

pub async fn unlock_wallet(State(state): State<Arc<AppState>>) -> Result<Json<&'static str>, ApiError> {
    let Some(passphrase) = state.wallet_passphrase.as_ref() else {
        tracing::error!("Wallet unlock requested but WALLET_PASS is not set");
        return Err(ApiError::new(
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Wallet passphrase is not configured",
        ));
    };

    match state.rpc.wallet_passphrase(passphrase, state.unlock_secs).await {
        Ok(()) => {
            tracing::info!(unlock_secs = state.unlock_secs, "Wallet unlocked");
            Ok(Json("OK"))
        }
        Err(e) if e.is_wrong_passphrase() => {
            tracing::warn!("Wallet node rejected the configured passphrase");
            Err(ApiError::bad_request("Invalid wallet passphrase"))
        }
        Err(e) => Err(ApiError::upstream(REQUEST_FAILED, &e)),
    }
}

// ─── Wallet pass-through ─────────────────────────────────────────────────────

pub async fn balance(State(state): State<Arc<AppState>>) -> Result<Json<BalanceResponse>, ApiError> {
    let btc = state
        .rpc
        .get_balance("*")
        .await
        .map_err(|e| ApiError::upstream("Could not obtain platform balance", &e))?;
    Ok(Json(BalanceResponse {
        balance: format!("{:.8}", btc),
    }))
}

pub async fn transactions(
    State(state): State<Arc<AppState>>,
    body: Body<LabelRequest>,
) -> Result<Json<TransactionsResponse>, ApiError> {
    let Json(req) = body?;
    let label = require_label(&req.label)?;
    let transactions = state
        .rpc
        .list_transactions(label)
        .await
        .map_err(|e| ApiError::upstream(REQUEST_FAILED, &e))?;
    Ok(Json(TransactionsResponse { transactions }))
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    body: Body<SendRequest>,
) -> Result<Json<TxidResponse>, ApiError> {
    let Json(req) = body?;
    let destination = require_address(&req.destination, "destination")?;
    let amount = require_amount(req.amount, "amount")?;

    let txid = state
        .rpc
        .send_to_address(destination, amount)
        .await
        .map_err(|e| ApiError::upstream("Error sending transaction", &e))?;
    tracing::info!(txid = %txid, "Transaction sent");
    Ok(Json(TxidResponse { txid }))
}

pub async fn send_from(
    State(state): State<Arc<AppState>>,
    body: Body<SendFromRequest>,
) -> Result<Json<TxidResponse>, ApiError> {
    let Json(req) = body?;
    let source = require_account(&req.source, "source")?;
    let destination = require_address(&req.destination, "destination")?;
    let amount = require_amount(req.amount, "amount")?;

    let txid = state
        .rpc
        .send_from(source, destination, amount)
        .await
        .map_err(|e| ApiError::upstream("Error sending transaction", &e))?;
    tracing::info!(txid = %txid, source = %source, "Transaction sent");
    Ok(Json(TxidResponse { txid }))
}

pub async fn send_many(
    State(state): State<Arc<AppState>>,
    body: Body<SendManyRequest>,
) -> Result<Json<TxidResponse>, ApiError> {
    let Json(req) = body?;
    let source = require_account(&req.source, "source")?;
    if req.destinations.is_empty() {
        return Err(ApiError::missing_field("destinations"));
    }
    for (address, amount) in &req.destinations {
        require_address(address, "destinations")?;
        require_amount(Some(*amount), "destinations")?;
    }

    let txid = state
        .rpc
        .send_many(source, &req.destinations)
        .await
        .map_err(|e| ApiError::upstream("Error sending transaction", &e))?;
    tracing::info!(txid = %txid, outputs = req.destinations.len(), "Batch transaction sent");
    Ok(Json(TxidResponse { txid }))
}

pub async fn move_funds(
    State(state): State<Arc<AppState>>,
    body: Body<MoveRequest>,
) -> Result<Json<bool>, ApiError> {
    let Json(req) = body?;
    let source = require_account(&req.source, "source")?;
    let destination = require_account(&req.destination, "destination")?;
    let amount = require_amount(req.amount, "amount")?;

    let moved = state
        .rpc
        .move_funds(source, destination, amount)
        .await
        .map_err(|e| ApiError::upstream("Error sending transaction", &e))?;
    Ok(Json(moved))
}

pub async fn create_account(
    State(state): State<Arc<AppState>>,
    body: Body<LabelRequest>,
) -> Result<Json<&'static str>, ApiError> {
    let Json(req) = body?;
    let label = require_label(&req.label)?;
    state
        .rpc
        .create_new_account(label)
        .await
        .map_err(|e| ApiError::upstream(REQUEST_FAILED, &e))?;
    tracing::info!(label = %label, "Wallet account created");
    Ok(Json("OK"))
}

pub async fn account_address(
    State(state): State<Arc<AppState>>,
    body: Body<LabelRequest>,
) -> Result<Json<AddressResponse>, ApiError> {
    let Json(req) = body?;
    let label = require_label(&req.label)?;
    let address = state
        .rpc
        .get_account_address(label)
        .await
        .map_err(|e| ApiError::upstream(REQUEST_FAILED, &e))?;

    let wallet = state.ledger.record_address(label, &address)?;
    Ok(Json(AddressResponse {
        address: wallet.address,
    }))
}

// ─── Validation ──────────────────────────────────────────────────────────────

fn require_account<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if value.is_empty() || value.len() > MAX_ACCOUNT_ID_LEN || value.chars().any(char::is_control) {
        return Err(ApiError::missing_field(field));
    }
    Ok(value)
}

fn require_label(value: &str) -> Result<&str, ApiError> {
    require_account(value, "label")
}

/// Shape check only; the wallet node decodes the address for real.
fn require_address<'a>(value: &'a str, field: &'static str) -> Result<&'a str, ApiError> {
    let value = value.trim();
    if !(26..=90).contains(&value.len()) || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::invalid_address(field));
    }
    Ok(value)
}

fn require_amount(amount: Option<f64>, field: &'static str) -> Result<f64, ApiError> {
    match amount {
        Some(a) if a.is_finite() && a > 0.0 && a <= MAX_AMOUNT_BTC => Ok(a),
        _ => Err(ApiError::invalid_amount(field)),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

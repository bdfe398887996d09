// Plutus — HTTP server
//
// Builds the axum router over shared application state. Routes that reach
// the wallet node each own one throttle for the lifetime of the process,
// applied ahead of the credential check.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use zeroize::Zeroizing;

use super::handlers;
use super::middleware::{require_bearer, throttle_requests, ThrottleGate};
use crate::custody::{AccountKeyRegistry, CredentialAuthority, MultisigProvisioner, SimpleWalletLedger};
use crate::rpc::WalletRpc;
use crate::throttle::RequestThrottle;

/// Routes that call the wallet node and are therefore throttled.
pub const THROTTLED_ROUTES: [&str; 9] = [
    "/multisig",
    "/balance",
    "/transactions",
    "/send",
    "/sendfrom",
    "/sendmany",
    "/move",
    "/account",
    "/account/address",
];

/// One long-lived throttle per wallet route.
#[derive(Debug, Clone)]
pub struct RouteThrottles {
    routes: HashMap<&'static str, Arc<RequestThrottle>>,
    max_wait: Duration,
}

impl RouteThrottles {
    pub fn new(rate_per_sec: u32, max_wait: Duration) -> Self {
        let routes = THROTTLED_ROUTES
            .iter()
            .map(|path| (*path, Arc::new(RequestThrottle::per_second(rate_per_sec))))
            .collect();
        Self { routes, max_wait }
    }

    /// Panics if `path` is not one of [`THROTTLED_ROUTES`].
    fn gate(&self, path: &'static str) -> ThrottleGate {
        ThrottleGate {
            throttle: Arc::clone(&self.routes[path]),
            max_wait: self.max_wait,
        }
    }
}

pub struct AppState {
    pub credentials: Arc<CredentialAuthority>,
    pub registry: Arc<AccountKeyRegistry>,
    pub provisioner: Arc<MultisigProvisioner>,
    pub ledger: Arc<SimpleWalletLedger>,
    pub rpc: Arc<dyn WalletRpc>,
    pub wallet_passphrase: Option<Zeroizing<String>>,
    pub unlock_secs: u64,
    pub throttles: RouteThrottles,
}

pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let authed = |route: MethodRouter<Arc<AppState>>| -> MethodRouter<Arc<AppState>> {
        route.layer(from_fn_with_state(Arc::clone(&state), require_bearer))
    };
    let throttled = |path: &'static str, route: MethodRouter<Arc<AppState>>| -> MethodRouter<Arc<AppState>> {
        authed(route).layer(from_fn_with_state(state.throttles.gate(path), throttle_requests))
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/pubkey", authed(post(handlers::submit_pubkey)))
        .route("/wallet/unlock", authed(post(handlers::unlock_wallet)))
        .route("/multisig", throttled("/multisig", post(handlers::provision_escrow)))
        .route("/balance", throttled("/balance", get(handlers::balance)))
        .route("/transactions", throttled("/transactions", post(handlers::transactions)))
        .route("/send", throttled("/send", post(handlers::send)))
        .route("/sendfrom", throttled("/sendfrom", post(handlers::send_from)))
        .route("/sendmany", throttled("/sendmany", post(handlers::send_many)))
        .route("/move", throttled("/move", post(handlers::move_funds)))
        .route("/account", throttled("/account", post(handlers::create_account)))
        .route(
            "/account/address",
            throttled("/account/address", post(handlers::account_address)),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(Arc::clone(&state))
}

pub async fn serve(state: Arc<AppState>, addr: SocketAddr, request_timeout: Duration) -> std::io::Result<()> {
    let app = router(state, request_timeout);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Plutus gateway listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Plutus gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl-C, shutting down"),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

// Plutus — Simple Wallet Ledger
//
// Label to address bindings for plain (non-escrow) accounts created on the
// wallet node.

use std::sync::Arc;

use super::CustodyError;
use crate::store::{SimpleWallet, SimpleWalletStore, StoreError};

pub struct SimpleWalletLedger {
    store: Arc<dyn SimpleWalletStore>,
}

impl SimpleWalletLedger {
    pub fn new(store: Arc<dyn SimpleWalletStore>) -> Self {
        Self { store }
    }

    /// Bind `label` to `address`. Recording the same binding again is a
    /// no-op; a different address for a known label is rejected.
    pub fn record_address(&self, label: &str, address: &str) -> Result<SimpleWallet, CustodyError> {
        if let Some(existing) = self.store.simple_wallet(label)? {
            return check_binding(existing, label, address);
        }

        match self.store.insert_simple_wallet(label, address) {
            Ok(wallet) => {
                tracing::info!(label = %label, address = %address, "Simple wallet recorded");
                Ok(wallet)
            }
            // Lost a race with another writer for the same label.
            Err(StoreError::Conflict(_)) => match self.store.simple_wallet(label)? {
                Some(existing) => check_binding(existing, label, address),
                None => Err(CustodyError::DuplicateLabel {
                    label: label.to_string(),
                }),
            },
            Err(e) => Err(e.into()),
        }
    }
}

fn check_binding(existing: SimpleWallet, label: &str, address: &str) -> Result<SimpleWallet, CustodyError> {
    if existing.address == address {
        Ok(existing)
    } else {
        Err(CustodyError::DuplicateLabel {
            label: label.to_string(),
        })
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

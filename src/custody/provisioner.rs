// Plutus — Multisig Provisioner
//
// Builds a 2-of-3 escrow address for a customer and vendor pair with an
// operator key as the third signer.
//
// Every key is resolved, decoded and checked before the wallet node is
// contacted. Once the node has answered, the result is either persisted or
// reported on the `plutus::reconciliation` target. The RPC call and the write
// run in their own task.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::registry::validate_account_id;
use super::{pubkey, AccountKeyRegistry, CustodyError, OperatorKeyring, SignerRole};
use crate::rpc::WalletRpc;
use crate::store::{AuditLog, EscrowWallet, EscrowWalletStore, NewEscrowWallet};

/// Signatures needed to spend from an escrow address.
pub const REQUIRED_SIGNATURES: u32 = 2;

type PairSet = Arc<Mutex<HashSet<(String, String)>>>;

pub struct MultisigProvisioner {
    registry: Arc<AccountKeyRegistry>,
    keyring: Arc<OperatorKeyring>,
    wallets: Arc<dyn EscrowWalletStore>,
    audit: Arc<dyn AuditLog>,
    rpc: Arc<dyn WalletRpc>,
    in_flight: PairSet,
}

impl MultisigProvisioner {
    pub fn new(
        registry: Arc<AccountKeyRegistry>,
        keyring: Arc<OperatorKeyring>,
        wallets: Arc<dyn EscrowWalletStore>,
        audit: Arc<dyn AuditLog>,
        rpc: Arc<dyn WalletRpc>,
    ) -> Self {
        Self {
            registry,
            keyring,
            wallets,
            audit,
            rpc,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub async fn provision_escrow(&self, customer: &str, vendor: &str) -> Result<EscrowWallet, CustodyError> {
        validate_account_id(customer, "customer")?;
        validate_account_id(vendor, "vendor")?;

        let customer_raw = self.registry.lookup(customer, SignerRole::Customer)?;
        let vendor_raw = self.registry.lookup(vendor, SignerRole::Vendor)?;

        let customer_key = pubkey::decode_public_key(&customer_raw)
            .ok_or(CustodyError::InvalidPublicKey { field: "customer" })?;
        let vendor_key = pubkey::decode_public_key(&vendor_raw)
            .ok_or(CustodyError::InvalidPublicKey { field: "vendor" })?;

        let operator_raw = self.keyring.select_key()?;
        let operator_key = pubkey::decode_public_key(&operator_raw)
            .ok_or(CustodyError::InvalidPublicKey { field: "operator" })?;

        if customer_key == vendor_key || customer_key == operator_key || vendor_key == operator_key {
            return Err(CustodyError::DuplicateSignerKey);
        }

        let guard = PairGuard::acquire(&self.in_flight, customer, vendor)
            .ok_or(CustodyError::ProvisioningInProgress)?;

        let pending = NewEscrowWallet {
            customer_account: customer.to_string(),
            vendor_account: vendor.to_string(),
            customer_key: pubkey::compressed(&customer_key),
            operator_key: pubkey::compressed(&operator_key),
            vendor_key: pubkey::compressed(&vendor_key),
            address: String::new(),
            redeem_script: String::new(),
        };

        let rpc = Arc::clone(&self.rpc);
        let wallets = Arc::clone(&self.wallets);
        let audit = Arc::clone(&self.audit);

        let task = tokio::spawn(async move {
            let _guard = guard;
            create_and_record(rpc.as_ref(), wallets.as_ref(), audit.as_ref(), pending).await
        });

        task.await.map_err(|e| CustodyError::Aborted(e.to_string()))?
    }
}

async fn create_and_record(
    rpc: &dyn WalletRpc,
    wallets: &dyn EscrowWalletStore,
    audit: &dyn AuditLog,
    mut pending: NewEscrowWallet,
) -> Result<EscrowWallet, CustodyError> {
    let keys = [
        hex::encode(&pending.customer_key),
        hex::encode(&pending.vendor_key),
        hex::encode(&pending.operator_key),
    ];

    let multisig = rpc
        .create_multisig(REQUIRED_SIGNATURES, &keys)
        .await
        .map_err(|e| {
            tracing::warn!(
                customer = %pending.customer_account,
                vendor = %pending.vendor_account,
                error = %e,
                "Wallet node rejected createmultisig"
            );
            CustodyError::ProvisioningFailed(e)
        })?;

    pending.address = multisig.address;
    pending.redeem_script = multisig.redeem_script;

    let wallet = match wallets.insert_escrow_wallet(&pending) {
        Ok(wallet) => wallet,
        Err(source) => {
            tracing::error!(
                target: "plutus::reconciliation",
                customer = %pending.customer_account,
                vendor = %pending.vendor_account,
                address = %pending.address,
                redeem_script = %pending.redeem_script,
                operator_key = %keys[2],
                error = %source,
                "Escrow address created on wallet node but not persisted"
            );
            return Err(CustodyError::PersistenceFailed {
                address: pending.address,
                source,
            });
        }
    };

    let details = format!("customer={} vendor={}", wallet.customer_account, wallet.vendor_account);
    if let Err(e) = audit.record(&wallet.address, "escrow_provisioned", "plutus", Some(&details)) {
        tracing::warn!(address = %wallet.address, error = %e, "Failed to audit escrow provisioning");
    }
    tracing::info!(
        customer = %wallet.customer_account,
        vendor = %wallet.vendor_account,
        address = %wallet.address,
        "Escrow wallet provisioned"
    );
    Ok(wallet)
}

/// Marks a (customer, vendor) pair as being provisioned until dropped.
struct PairGuard {
    in_flight: PairSet,
    pair: (String, String),
}

impl PairGuard {
    fn acquire(in_flight: &PairSet, customer: &str, vendor: &str) -> Option<Self> {
        let pair = (customer.to_string(), vendor.to_string());
        let mut set = in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(pair.clone()) {
            return None;
        }
        Some(Self {
            in_flight: Arc::clone(in_flight),
            pair,
        })
    }
}

impl Drop for PairGuard {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.pair);
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custody::pubkey::fixtures;
    use crate::rpc::{MultisigAddress, RpcError};
    use crate::store::{Database, SqliteStore, StoreError};
    use async_trait::async_trait;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::Value;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Semaphore;

    const ADDRESS: &str = "bc1qescrowaddressxyz";
    const SCRIPT: &str = "522102aabbcc";

    /// Wallet node stand-in that records `createmultisig` calls.
    #[derive(Default)]
    struct StubRpc {
        calls: AtomicUsize,
        seen: Mutex<Vec<Vec<String>>>,
        fail: bool,
        gate: Option<Arc<Semaphore>>,
    }

    impl StubRpc {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn gated(gate: Arc<Semaphore>) -> Self {
            Self {
                gate: Some(gate),
                ..Self::default()
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl WalletRpc for StubRpc {
        async fn create_multisig(&self, required: u32, keys: &[String]) -> Result<MultisigAddress, RpcError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(keys.to_vec());
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.fail {
                return Err(RpcError::Node {
                    code: -5,
                    message: "Invalid public key".to_string(),
                });
            }
            assert_eq!(required, 2);
            Ok(MultisigAddress {
                address: ADDRESS.to_string(),
                redeem_script: SCRIPT.to_string(),
            })
        }

        async fn wallet_passphrase(&self, _: &str, _: u64) -> Result<(), RpcError> {
            unimplemented!()
        }
        async fn get_balance(&self, _: &str) -> Result<f64, RpcError> {
            unimplemented!()
        }
        async fn list_transactions(&self, _: &str) -> Result<Value, RpcError> {
            unimplemented!()
        }
        async fn send_to_address(&self, _: &str, _: f64) -> Result<String, RpcError> {
            unimplemented!()
        }
        async fn send_from(&self, _: &str, _: &str, _: f64) -> Result<String, RpcError> {
            unimplemented!()
        }
        async fn send_many(&self, _: &str, _: &BTreeMap<String, f64>) -> Result<String, RpcError> {
            unimplemented!()
        }
        async fn move_funds(&self, _: &str, _: &str, _: f64) -> Result<bool, RpcError> {
            unimplemented!()
        }
        async fn create_new_account(&self, _: &str) -> Result<(), RpcError> {
            unimplemented!()
        }
        async fn get_account_address(&self, _: &str) -> Result<String, RpcError> {
            unimplemented!()
        }
    }

    /// Escrow store whose writes always fail.
    struct BrokenWallets;

    impl EscrowWalletStore for BrokenWallets {
        fn insert_escrow_wallet(&self, _: &NewEscrowWallet) -> Result<EscrowWallet, StoreError> {
            Err(StoreError::Other("disk full".to_string()))
        }
        fn escrow_wallet(&self, _: &str) -> Result<Option<EscrowWallet>, StoreError> {
            Ok(None)
        }
        fn escrow_wallets_for_pair(&self, _: &str, _: &str) -> Result<Vec<EscrowWallet>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct Harness {
        store: SqliteStore,
        registry: Arc<AccountKeyRegistry>,
        keyring: Arc<OperatorKeyring>,
    }

    impl Harness {
        /// Keyring = {K1}; alice -> Ca, bob -> Cb.
        fn new() -> Self {
            let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
            let registry = Arc::new(AccountKeyRegistry::new(Arc::new(store.clone())));
            let keyring = Arc::new(OperatorKeyring::with_rng(
                Arc::new(store.clone()),
                Arc::new(store.clone()),
                StdRng::seed_from_u64(7),
            ));

            keyring.register(&fixtures::compressed(1), "test").unwrap();
            registry.submit("alice", &fixtures::compressed(2)).unwrap();
            registry.submit("bob", &fixtures::uncompressed(3)).unwrap();

            Self {
                store,
                registry,
                keyring,
            }
        }

        fn provisioner(&self, rpc: Arc<StubRpc>) -> MultisigProvisioner {
            self.provisioner_with(rpc, Arc::new(self.store.clone()))
        }

        fn provisioner_with(&self, rpc: Arc<StubRpc>, wallets: Arc<dyn EscrowWalletStore>) -> MultisigProvisioner {
            MultisigProvisioner::new(
                Arc::clone(&self.registry),
                Arc::clone(&self.keyring),
                wallets,
                Arc::new(self.store.clone()),
                rpc,
            )
        }

        fn wallet_count(&self) -> usize {
            self.store.escrow_wallets_for_pair("alice", "bob").unwrap().len()
                + self.store.escrow_wallets_for_pair("carol", "bob").unwrap().len()
        }
    }

    #[tokio::test]
    async fn test_provision_persists_compressed_keys() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let wallet = provisioner.provision_escrow("alice", "bob").await.unwrap();

        assert_eq!(wallet.address, ADDRESS);
        assert_eq!(wallet.redeem_script, SCRIPT);
        assert_eq!(wallet.customer_key, fixtures::compressed(2));
        assert_eq!(wallet.operator_key, fixtures::compressed(1));
        assert_eq!(wallet.vendor_key, fixtures::compressed(3));

        let stored = harness.store.escrow_wallet(ADDRESS).unwrap().unwrap();
        assert_eq!(stored, wallet);

        let seen = rpc.seen.lock().unwrap();
        assert_eq!(
            seen[0],
            vec![
                hex::encode(fixtures::compressed(2)),
                hex::encode(fixtures::compressed(3)),
                hex::encode(fixtures::compressed(1)),
            ]
        );

        let audit = harness.store.entries(ADDRESS).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, "escrow_provisioned");
    }

    #[tokio::test]
    async fn test_unknown_customer_touches_nothing() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let err = provisioner.provision_escrow("carol", "bob").await.unwrap_err();

        assert!(matches!(
            err,
            CustodyError::PublicKeyNotFound { field: SignerRole::Customer }
        ));
        assert_eq!(err.field(), Some("customer"));
        assert_eq!(rpc.calls(), 0);
        assert_eq!(harness.wallet_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_vendor_is_reported_as_vendor() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let err = provisioner.provision_escrow("alice", "dave").await.unwrap_err();
        assert_eq!(err.field(), Some("vendor"));
        assert_eq!(rpc.calls(), 0);
    }

    #[tokio::test]
    async fn test_empty_keyring_is_reported_before_rpc() {
        let store = SqliteStore::new(Arc::new(Database::open_in_memory().unwrap()));
        let registry = Arc::new(AccountKeyRegistry::new(Arc::new(store.clone())));
        let keyring = Arc::new(OperatorKeyring::new(Arc::new(store.clone()), Arc::new(store.clone())));
        registry.submit("alice", &fixtures::compressed(2)).unwrap();
        registry.submit("bob", &fixtures::compressed(3)).unwrap();

        let rpc = Arc::new(StubRpc::default());
        let provisioner = MultisigProvisioner::new(
            registry,
            keyring,
            Arc::new(store.clone()),
            Arc::new(store),
            Arc::clone(&rpc) as Arc<dyn WalletRpc>,
        );

        let err = provisioner.provision_escrow("alice", "bob").await.unwrap_err();
        assert!(matches!(err, CustodyError::NoOperatorKeysConfigured));
        assert_eq!(rpc.calls(), 0);
    }

    #[tokio::test]
    async fn test_colliding_signer_keys_are_rejected() {
        let harness = Harness::new();
        // Vendor reuses the operator's key.
        harness.registry.submit("mallory", &fixtures::compressed(1)).unwrap();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let err = provisioner.provision_escrow("alice", "mallory").await.unwrap_err();
        assert!(matches!(err, CustodyError::DuplicateSignerKey));

        let err = provisioner.provision_escrow("alice", "alice").await.unwrap_err();
        assert!(matches!(err, CustodyError::DuplicateSignerKey));

        assert_eq!(rpc.calls(), 0);
    }

    #[tokio::test]
    async fn test_rpc_failure_persists_nothing() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::failing());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let err = provisioner.provision_escrow("alice", "bob").await.unwrap_err();
        assert!(matches!(err, CustodyError::ProvisioningFailed(_)));
        assert_eq!(rpc.calls(), 1);
        assert_eq!(harness.wallet_count(), 0);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_distinct() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner_with(Arc::clone(&rpc), Arc::new(BrokenWallets));

        let err = provisioner.provision_escrow("alice", "bob").await.unwrap_err();
        match err {
            CustodyError::PersistenceFailed { address, .. } => assert_eq!(address, ADDRESS),
            other => panic!("expected PersistenceFailed, got {:?}", other),
        }
        assert_eq!(rpc.calls(), 1);
    }

    /// Log sink shared with a scoped `fmt` subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_is_logged_for_reconciliation() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner_with(Arc::clone(&rpc), Arc::new(BrokenWallets));
        provisioner.provision_escrow("alice", "bob").await.unwrap_err();

        let line = logs
            .contents()
            .lines()
            .find(|l| l.contains("plutus::reconciliation"))
            .map(str::to_string)
            .expect("reconciliation event should be logged");
        assert!(line.contains("ERROR"));
        assert!(line.contains(ADDRESS));
        assert!(line.contains(SCRIPT));
        assert!(line.contains("customer=alice"));
        assert!(line.contains("vendor=bob"));
    }

    #[tokio::test]
    async fn test_address_owned_by_another_pair_is_not_reused() {
        let harness = Harness::new();
        // Two accounts sharing one key make the node hand back the same address.
        harness.registry.submit("alice-alt", &fixtures::compressed(2)).unwrap();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let first = provisioner.provision_escrow("alice", "bob").await.unwrap();
        let err = provisioner.provision_escrow("alice-alt", "bob").await.unwrap_err();

        match err {
            CustodyError::PersistenceFailed { address, source } => {
                assert_eq!(address, ADDRESS);
                assert!(matches!(source, StoreError::Conflict(_)), "got {:?}", source);
            }
            other => panic!("expected PersistenceFailed, got {:?}", other),
        }
        assert_eq!(rpc.calls(), 2);
        assert!(harness.store.escrow_wallets_for_pair("alice-alt", "bob").unwrap().is_empty());

        let stored = harness.store.escrow_wallet(ADDRESS).unwrap().unwrap();
        assert_eq!(stored, first);
        assert_eq!(harness.store.entries(ADDRESS).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_provisioning_for_same_pair_is_refused() {
        let harness = Harness::new();
        let gate = Arc::new(Semaphore::new(0));
        let rpc = Arc::new(StubRpc::gated(Arc::clone(&gate)));
        let provisioner = Arc::new(harness.provisioner(Arc::clone(&rpc)));

        let first = {
            let provisioner = Arc::clone(&provisioner);
            tokio::spawn(async move { provisioner.provision_escrow("alice", "bob").await })
        };
        while rpc.calls() == 0 {
            tokio::task::yield_now().await;
        }

        let err = provisioner.provision_escrow("alice", "bob").await.unwrap_err();
        assert!(matches!(err, CustodyError::ProvisioningInProgress));

        gate.add_permits(1);
        let wallet = first.await.unwrap().unwrap();
        assert_eq!(wallet.address, ADDRESS);
        assert_eq!(rpc.calls(), 1);

        // The pair is released once the first call completes.
        gate.add_permits(1);
        let again = provisioner.provision_escrow("alice", "bob").await.unwrap();
        assert_eq!(again.id, wallet.id, "repeated address is returned, not duplicated");
        assert_eq!(harness.wallet_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_account_ids_are_invalid_input() {
        let harness = Harness::new();
        let rpc = Arc::new(StubRpc::default());
        let provisioner = harness.provisioner(Arc::clone(&rpc));

        let err = provisioner.provision_escrow("", "bob").await.unwrap_err();
        assert!(matches!(err, CustodyError::InvalidInput { field: "customer" }));
        let err = provisioner.provision_escrow("alice", " ").await.unwrap_err();
        assert!(matches!(err, CustodyError::InvalidInput { field: "vendor" }));
    }
}

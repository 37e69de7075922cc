use satchel_core::{Destination, Keypair, PubKey, Script, Transaction, TxOut, WalletTx};
use satchel_storage::Database;
use satchel_wallet::keys::record_key;
use satchel_wallet::{
    decode_current, is_key_type, parse_tag, recover, recover_all, recover_keys_only_filter, tags,
    verify_database_file, verify_environment, DbStatus, HdChain, KeyMetadata, MasterKey,
    WalletBatch, WalletState,
};
use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;

fn wtx(n: i64) -> WalletTx {
    let tx = Transaction::new(
        vec![],
        vec![TxOut {
            value: n,
            script_pubkey: Script::new(vec![0x00, 0x14]),
        }],
    );
    WalletTx::new(tx, 1_700_000_000 + n)
}

fn load(path: &Path) -> (DbStatus, WalletState) {
    let db = Database::open(path).unwrap();
    let mut state = WalletState::new();
    let status = WalletBatch::new(&db).load_wallet(&mut state);
    (status, state)
}

fn raw_records(path: &Path) -> BTreeMap<Vec<u8>, Vec<u8>> {
    let db = Database::open(path).unwrap();
    db.iter().map(|r| r.unwrap()).collect()
}

/// A wallet with two keys, metadata, a label and three transactions.
fn populate(path: &Path) -> Vec<Keypair> {
    let db = Database::open(path).unwrap();
    let keys = vec![Keypair::generate(), Keypair::generate()];
    let mut batch = WalletBatch::new(&db);
    for (i, kp) in keys.iter().enumerate() {
        batch
            .write_key(&kp.public_key(), &kp.private_key(), &KeyMetadata::new(i as i64))
            .unwrap();
    }
    batch.write_master_key(1, &MasterKey::default()).unwrap();
    batch
        .write_name(&Destination::KeyHash(keys[0].id()), "savings")
        .unwrap();
    for n in 1..=3 {
        batch.write_tx(&wtx(n)).unwrap();
    }
    batch.write_hd_chain(&HdChain::new(keys[0].id())).unwrap();
    batch.close().unwrap();
    db.flush().unwrap();
    keys
}

#[test]
fn test_wallet_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    let keys = populate(&path);

    let (status, state) = load(&path);
    assert_eq!(status, DbStatus::LoadOk);
    assert_eq!(state.keys.len(), 2);
    assert_eq!(state.transactions.len(), 3);
    assert_eq!(state.master_keys.len(), 1);
    let entry = &state.address_book[&Destination::KeyHash(keys[0].id())];
    assert_eq!(entry.name.as_deref(), Some("savings"));
}

#[test]
fn test_corrupt_transaction_does_not_hide_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    let keys = populate(&path);
    {
        let db = Database::open(&path).unwrap();
        let key = record_key(tags::TX, &wtx(2).id()).unwrap();
        db.put_raw(&key, &[0xDE, 0xAD]).unwrap();
        db.flush().unwrap();
    }

    let (status, state) = load(&path);
    assert_ne!(status, DbStatus::LoadOk);
    assert_eq!(status, DbStatus::NoncriticalError);
    for kp in &keys {
        assert!(state.keys.contains_key(&kp.id()));
    }
    assert_eq!(state.transactions.len(), 2);
}

#[test]
fn test_hd_chain_upgrade_across_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    let seed = Keypair::generate().id();
    {
        let db = Database::open(&path).unwrap();
        let chain = HdChain {
            version: HdChain::VERSION_HD_BASE,
            external_counter: 5,
            internal_counter: 0,
            seed_id: seed,
        };
        WalletBatch::new(&db).write_hd_chain(&chain).unwrap();
        db.flush().unwrap();
    }

    let (_, state) = load(&path);
    let chain = state.hd_chain.unwrap();
    assert_eq!(chain.version, 1);
    assert_eq!(chain.external_counter, 5);
    assert_eq!(chain.internal_counter, 0);

    {
        let db = Database::open(&path).unwrap();
        let upgraded = HdChain {
            version: HdChain::VERSION_HD_CHAIN_SPLIT,
            internal_counter: 3,
            ..chain
        };
        WalletBatch::new(&db).write_hd_chain(&upgraded).unwrap();
        db.flush().unwrap();
    }

    let (_, state) = load(&path);
    let chain = state.hd_chain.unwrap();
    assert_eq!(chain.version, 2);
    assert_eq!(chain.external_counter, 5);
    assert_eq!(chain.internal_counter, 3);
    assert_eq!(chain.seed_id, seed);
}

#[test]
fn test_too_new_metadata_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    populate(&path);
    {
        let db = Database::open(&path).unwrap();
        let meta = KeyMetadata {
            version: 99,
            ..KeyMetadata::new(0)
        };
        let key = record_key(tags::KEYMETA, &PubKey::new(vec![9; 32])).unwrap();
        db.put_raw(&key, &satchel_wallet::encode(&meta).unwrap()).unwrap();
        db.flush().unwrap();
    }
    let (status, state) = load(&path);
    assert_eq!(status, DbStatus::TooNew);
    // Everything else still loads
    assert_eq!(state.keys.len(), 2);
}

#[test]
fn test_keys_only_recovery_is_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    populate(&path);
    let original = raw_records(&path);

    let report = recover(&path, recover_keys_only_filter).unwrap();

    let expected: BTreeMap<_, _> = original
        .iter()
        .filter(|(k, _)| parse_tag(k).is_some_and(|t| is_key_type(&t)))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let salvaged = raw_records(&report.backup_path);
    assert_eq!(salvaged, expected);
    assert_eq!(report.kept, expected.len());
    assert_eq!(report.kept + report.dropped, original.len());

    // Two plain keys and one master key
    assert_eq!(report.kept, 3);
    // The damaged store's records are left alone
    assert_eq!(raw_records(&path), original);

    let (status, state) = load(&report.backup_path);
    assert_eq!(status, DbStatus::LoadOk);
    assert_eq!(state.keys.len(), 2);
    assert!(state.transactions.is_empty());
}

#[test]
fn test_recover_all_roundtrips_wallet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    populate(&path);
    let original = raw_records(&path);

    let report = recover_all(&path).unwrap();
    assert_eq!(raw_records(&report.backup_path), original);
    assert_eq!(report.dropped, 0);
}

#[test]
fn test_zap_selected_after_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    populate(&path);

    let db = Database::open(&path).unwrap();
    let mut batch = WalletBatch::new(&db);
    let absent = wtx(42).id();
    let (removed, not_found) = batch
        .zap_selected_transactions(&[wtx(1).id(), absent, wtx(3).id(), wtx(1).id()])
        .unwrap();

    let mut expected = vec![wtx(1).id(), wtx(3).id()];
    expected.sort();
    assert_eq!(removed, expected);
    assert_eq!(not_found, vec![absent]);

    let (ids, bodies) = batch.find_wallet_transactions().unwrap();
    assert_eq!(ids, vec![wtx(2).id()]);
    assert_eq!(bodies, vec![wtx(2)]);
}

#[test]
fn test_flush_cadence_is_store_wide() {
    let dir = TempDir::new().unwrap();
    let db = Database::open(dir.path().join("wallet")).unwrap();

    for round in 0..3 {
        let mut batch = WalletBatch::new(&db);
        for i in 0..333 {
            batch.write_order_pos_next(round * 1000 + i).unwrap();
        }
    }
    assert_eq!(db.update_counter(), 999);
    assert_eq!(db.flush_count(), 0);

    WalletBatch::new(&db)
        .erase(&record_key(tags::POOL, &0i64).unwrap())
        .unwrap();
    assert_eq!(db.flush_count(), 1);
}

#[test]
fn test_verify_healthy_wallet() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    populate(&path);

    assert!(verify_environment(&path).is_ok());
    let result = verify_database_file(&path);
    assert!(result.is_ok());
    assert!(result.warnings.is_empty());
}

#[test]
fn test_metadata_written_with_key() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("wallet");
    let keys = populate(&path);

    let db = Database::open(&path).unwrap();
    let batch = WalletBatch::new(&db);
    let bytes = batch
        .read(&record_key(tags::KEYMETA, &keys[1].public_key()).unwrap())
        .unwrap()
        .unwrap();
    let meta: KeyMetadata = decode_current(&bytes).unwrap();
    assert_eq!(meta.create_time, 1);
    assert_eq!(meta.version, KeyMetadata::VERSION_WITH_KEY_ORIGIN);
}

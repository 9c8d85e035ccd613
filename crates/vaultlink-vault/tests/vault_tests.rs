//! Tests for vault lifecycle and persistence.
//!
//! These tests verify:
//! - Create / load roundtrip yields an identical public identity
//! - One vault per directory (create over existing fails, force overwrites)
//! - Exports never contain private key material
//! - Per-server registration state survives a reload

use vaultlink_protocol::crypto::verify_signature;
use vaultlink_protocol::{RelayError, VaultId};
use vaultlink_vault::{ServerState, Vault};

const RELAY: &str = "https://relay.example";

// ═══════════════════════════════════════════════════════════════
// Lifecycle: Nonexistent -> Created -> Loaded
// ═══════════════════════════════════════════════════════════════

#[test]
fn exists_is_false_before_creation() {
    let dir = tempfile::tempdir().unwrap();
    assert!(!Vault::exists(dir.path()));
}

#[test]
fn load_fails_when_no_vault_exists() {
    let dir = tempfile::tempdir().unwrap();
    match Vault::load(dir.path()) {
        Err(RelayError::VaultNotFound(_)) => {}
        other => panic!("expected VaultNotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn created_vault_is_immediately_usable() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), Some("alice")).unwrap();
    assert!(Vault::exists(dir.path()));
    assert_eq!(vault.alias(), Some("alice"));

    // Signing works without a reload.
    let sig = vault.sign(b"challenge");
    let identity = vault.public_identity();
    let verifying =
        vaultlink_protocol::crypto::verifying_key_from_hex(&identity.signing_public_key).unwrap();
    assert!(verify_signature(&verifying, b"challenge", &sig).is_ok());
}

#[test]
fn create_over_existing_vault_fails() {
    let dir = tempfile::tempdir().unwrap();
    Vault::create(dir.path(), None).unwrap();
    match Vault::create(dir.path(), None) {
        Err(RelayError::VaultExists(_)) => {}
        other => panic!("expected VaultExists, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn forced_create_replaces_the_identity() {
    let dir = tempfile::tempdir().unwrap();
    let old = Vault::create(dir.path(), None).unwrap();
    let old_id = old.vault_id().clone();
    drop(old);

    let new = Vault::create_forced(dir.path(), None).unwrap();
    assert_ne!(new.vault_id(), &old_id, "Force-create must mint a new identity");
}

#[test]
fn create_then_load_yields_identical_public_identity() {
    let dir = tempfile::tempdir().unwrap();
    let created = Vault::create(dir.path(), Some("carol")).unwrap();
    let created_identity = created.public_identity();
    drop(created);

    // Fresh load, as a new process would do.
    let loaded = Vault::load(dir.path()).unwrap();
    assert_eq!(loaded.public_identity(), created_identity);
}

#[test]
fn vault_id_is_derived_from_signing_public_key() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), None).unwrap();
    let identity = vault.public_identity();
    let verifying =
        vaultlink_protocol::crypto::verifying_key_from_hex(&identity.signing_public_key).unwrap();
    assert_eq!(
        vault.vault_id().as_str(),
        vaultlink_protocol::crypto::derive_vault_id(&verifying)
    );
    assert!(VaultId::is_valid_format(vault.vault_id().as_str()));
}

// ═══════════════════════════════════════════════════════════════
// Private material never leaves the vault
// ═══════════════════════════════════════════════════════════════

#[test]
fn exported_identity_contains_no_private_material() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), Some("dave")).unwrap();

    let signing_private = hex::encode(vault.signing_key().to_bytes());
    let encryption_private = hex::encode(vault.encryption_secret().to_bytes());

    let exported = serde_json::to_string(&vault.public_identity()).unwrap();
    assert!(!exported.contains(&signing_private));
    assert!(!exported.contains(&encryption_private));
}

#[test]
fn debug_output_contains_no_key_material() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), None).unwrap();
    let debug = format!("{:?}", vault);
    assert!(!debug.contains(&vault.public_identity().signing_public_key));
    assert!(!debug.contains(&hex::encode(vault.signing_key().to_bytes())));
}

#[test]
fn sealed_payload_opens_with_vault_secret() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), None).unwrap();
    let identity = vault.public_identity();

    let recipient_pub =
        vaultlink_protocol::crypto::x25519_public_from_hex(&identity.encryption_public_key)
            .unwrap();
    let envelope = vaultlink_protocol::crypto::seal_payload(&recipient_pub, b"for your eyes")
        .unwrap();
    assert_eq!(vault.open_payload(&envelope).unwrap(), b"for your eyes");
}

// ═══════════════════════════════════════════════════════════════
// Per-server registration state
// ═══════════════════════════════════════════════════════════════

#[test]
fn server_state_starts_unregistered() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), None).unwrap();
    assert!(!vault.is_registered(RELAY));
    assert!(vault.get_server_state(RELAY).is_none());
}

#[test]
fn server_state_persists_across_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut vault = Vault::create(dir.path(), None).unwrap();
    vault
        .set_server_state(
            RELAY,
            ServerState::registered(chrono::Utc::now(), Some("erin".into())),
        )
        .unwrap();
    drop(vault);

    let loaded = Vault::load(dir.path()).unwrap();
    assert!(loaded.is_registered(RELAY));
    assert_eq!(
        loaded.get_server_state(RELAY).unwrap().alias.as_deref(),
        Some("erin")
    );
    // State is per server; another relay is still unregistered.
    assert!(!loaded.is_registered("https://other.example"));
}

#[test]
fn alias_update_reaches_record_and_server_entry() {
    let dir = tempfile::tempdir().unwrap();
    let mut vault = Vault::create(dir.path(), None).unwrap();
    vault
        .set_server_state(RELAY, ServerState::registered(chrono::Utc::now(), None))
        .unwrap();
    vault.set_alias_local(RELAY, "frank").unwrap();
    drop(vault);

    let loaded = Vault::load(dir.path()).unwrap();
    assert_eq!(loaded.alias(), Some("frank"));
    assert_eq!(
        loaded.get_server_state(RELAY).unwrap().alias.as_deref(),
        Some("frank")
    );
}

#[test]
fn corrupted_record_is_rejected_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let vault = Vault::create(dir.path(), None).unwrap();
    drop(vault);

    // Swap in a mismatched signing key: the stored vault_id no longer
    // matches the key it claims to derive from.
    let path = dir.path().join("vault.json");
    let content = std::fs::read_to_string(&path).unwrap();
    let mut record: serde_json::Value = serde_json::from_str(&content).unwrap();
    let other = vaultlink_protocol::crypto::generate_signing_keypair();
    record["signing_private_key"] = serde_json::json!(hex::encode(other.to_bytes()));
    std::fs::write(&path, serde_json::to_string(&record).unwrap()).unwrap();

    assert!(matches!(
        Vault::load(dir.path()),
        Err(RelayError::InvalidKey(_))
    ));
}

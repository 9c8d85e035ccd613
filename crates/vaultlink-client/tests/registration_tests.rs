//! Tests for the challenge-response registration handshake.
//!
//! These tests verify:
//! - The strict challenge -> sign -> submit order produces a registration
//! - Registration is idempotent (already_registered reconciles to success)
//! - Challenges are single-use; forged or mismatched identities are
//!   rejected by a conforming relay
//! - Local server state is only written after a confirmed response

mod common;

use common::{agent, create_vault};

use serde_json::Value;
use vaultlink_client::{MemoryRelay, RegistrationOutcome, RelayClient, RelayTransport};
use vaultlink_protocol::{RegisterRequest, RelayError, EP_REGISTER};

// ═══════════════════════════════════════════════════════════════
// Handshake
// ═══════════════════════════════════════════════════════════════

#[test]
fn registration_succeeds_and_records_server_state() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(None);

    let mut client = agent(&relay, &mut vault);
    let outcome = client.register(None).unwrap();
    assert!(matches!(outcome, RegistrationOutcome::Registered { .. }));

    assert!(vault.is_registered(relay.addr()));
    let state = vault.get_server_state(relay.addr()).unwrap();
    assert!(state.registered_at.is_some());
}

#[test]
fn registration_consumes_its_challenge() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(None);

    agent(&relay, &mut vault).register(None).unwrap();
    assert_eq!(
        relay.outstanding_challenges(),
        0,
        "A completed handshake must leave no challenge behind"
    );
}

#[test]
fn registration_with_alias_is_resolvable() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(None);

    agent(&relay, &mut vault).register(Some("alice")).unwrap();

    let public = RelayClient::new(relay.addr(), relay.clone());
    let identity = public.resolve("alice").unwrap();
    assert_eq!(&identity.vault_id, vault.vault_id());
}

#[test]
fn vault_alias_is_offered_during_registration() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(Some("carol"));

    agent(&relay, &mut vault).register(None).unwrap();

    let public = RelayClient::new(relay.addr(), relay.clone());
    assert_eq!(
        &public.resolve("carol").unwrap().vault_id,
        vault.vault_id()
    );
}

// ═══════════════════════════════════════════════════════════════
// Idempotency and reconciliation
// ═══════════════════════════════════════════════════════════════

#[test]
fn second_registration_reconciles_to_already_registered() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(None);

    let mut client = agent(&relay, &mut vault);
    client.register(None).unwrap();
    let second = client.register(None).unwrap();
    assert_eq!(second, RegistrationOutcome::AlreadyRegistered);

    // The registered flag never flips back to false.
    assert!(vault.is_registered(relay.addr()));
}

#[test]
fn reregistration_after_reload_converges() {
    // A vault registered in a previous "process" runs the handshake
    // again after a reload; the relay still knows it, and the outcome
    // must converge to registered, not error.
    let relay = MemoryRelay::new();
    let (dir, mut vault) = create_vault(None);
    agent(&relay, &mut vault).register(None).unwrap();
    drop(vault);

    let mut reloaded = vaultlink_vault::Vault::load(dir.path()).unwrap();
    let outcome = agent(&relay, &mut reloaded).register(None).unwrap();
    assert_eq!(outcome, RegistrationOutcome::AlreadyRegistered);
    assert!(reloaded.is_registered(relay.addr()));
}

// ═══════════════════════════════════════════════════════════════
// Anti-spoofing: the relay side of the contract
// ═══════════════════════════════════════════════════════════════

fn forge_request(relay: &MemoryRelay, vault: &vaultlink_vault::Vault) -> RegisterRequest {
    let public = RelayClient::new(relay.addr(), relay.clone());
    let challenge = public.get_challenge().unwrap();
    let signature = vault.sign(challenge.as_bytes());
    let identity = vault.public_identity();
    RegisterRequest {
        vault_id: identity.vault_id,
        signing_public_key: identity.signing_public_key,
        encryption_public_key: identity.encryption_public_key,
        challenge,
        signature: hex::encode(signature.to_bytes()),
        alias: None,
    }
}

#[test]
fn challenge_cannot_be_replayed() {
    let relay = MemoryRelay::new();
    let (_dir, vault) = create_vault(None);

    let request = forge_request(&relay, &vault);
    let body = serde_json::to_value(&request).unwrap();
    relay.post(EP_REGISTER, &body).unwrap();

    // Same challenge, fresh attempt: must be refused.
    match relay.post(EP_REGISTER, &body) {
        Err(RelayError::Relay { code, .. }) => assert_eq!(code, "invalid_challenge"),
        other => panic!("replayed challenge must be rejected, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn self_chosen_challenge_is_rejected() {
    // A client skipping challenge issuance and submitting its own nonce
    // violates the handshake; the relay must refuse it.
    let relay = MemoryRelay::new();
    let (_dir, vault) = create_vault(None);

    let mut request = forge_request(&relay, &vault);
    request.challenge = "self-chosen-nonce".into();
    request.signature = hex::encode(vault.sign(b"self-chosen-nonce").to_bytes());

    let result = relay.post(EP_REGISTER, &serde_json::to_value(&request).unwrap());
    assert!(matches!(result, Err(RelayError::Relay { ref code, .. }) if code == "invalid_challenge"));
}

#[test]
fn signature_over_wrong_bytes_is_rejected() {
    let relay = MemoryRelay::new();
    let (_dir, vault) = create_vault(None);

    let mut request = forge_request(&relay, &vault);
    request.signature = hex::encode(vault.sign(b"not the challenge").to_bytes());

    let result = relay.post(EP_REGISTER, &serde_json::to_value(&request).unwrap());
    assert!(matches!(result, Err(RelayError::Relay { ref code, .. }) if code == "invalid_signature"));
}

#[test]
fn hijacking_anothers_vault_id_is_rejected() {
    // An attacker signing with their own key but claiming the victim's
    // vault ID: the ID no longer derives from the submitted key.
    let relay = MemoryRelay::new();
    let (_dir, victim) = create_vault(None);
    let (_dir2, attacker) = create_vault(None);

    let mut request = forge_request(&relay, &attacker);
    request.vault_id = victim.vault_id().clone();

    let result = relay.post(EP_REGISTER, &serde_json::to_value(&request).unwrap());
    assert!(matches!(result, Err(RelayError::Relay { ref code, .. }) if code == "invalid_vault_id"));
}

// ═══════════════════════════════════════════════════════════════
// No partial state on failure
// ═══════════════════════════════════════════════════════════════

/// Transport that issues challenges but drops the registration request,
/// as a network fault between handshake steps would.
struct DropsRegistration(MemoryRelay);

impl RelayTransport for DropsRegistration {
    fn get(&self, path: &str) -> Result<Value, RelayError> {
        self.0.get(path)
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, RelayError> {
        if path == EP_REGISTER {
            return Err(RelayError::Connection("connection reset".into()));
        }
        self.0.post(path, body)
    }
}

#[test]
fn failed_registration_leaves_no_local_state() {
    let relay = MemoryRelay::new();
    let (_dir, mut vault) = create_vault(None);

    let transport = DropsRegistration(relay.clone());
    let mut client = vaultlink_client::AgentClient::new(
        RelayClient::new(relay.addr(), transport),
        &mut vault,
    );
    let err = client.register(None).unwrap_err();
    assert!(err.is_transient());

    assert!(
        !vault.is_registered(relay.addr()),
        "server_state must only be written after a confirmed response"
    );

    // A retry is a fresh handshake and succeeds.
    agent(&relay, &mut vault).register(None).unwrap();
    assert!(vault.is_registered(relay.addr()));
}

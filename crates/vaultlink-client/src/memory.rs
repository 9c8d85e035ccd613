//! In-process relay implementing the server side of the wire contract.
//!
//! The real relay is an external, untrusted collaborator; this one exists
//! so the client's protocol logic can be exercised end to end without a
//! network. It enforces the server-side guarantees the client assumes:
//! single-use challenges, signature verification before registration,
//! per-server alias uniqueness, and idempotent acknowledgment.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use vaultlink_protocol::crypto::{derive_vault_id, signature_from_hex, verifying_key_from_hex};
use vaultlink_protocol::{
    AckRequest, AgentDirectoryEntry, RegisterRequest, RelayError, SendRequest, SetAliasRequest,
    VaultId, CODE_ALIAS_TAKEN, CODE_ALREADY_REGISTERED, CODE_NOT_FOUND, EP_ACK, EP_AGENTS,
    EP_ALIAS, EP_CHALLENGE, EP_MESSAGES, EP_REGISTER, EP_RESOLVE,
};

use crate::transport::{server_error, RelayTransport};

/// Server address the in-memory relay reports for vault server state.
pub const MEMORY_RELAY_ADDR: &str = "mem://relay";

#[derive(Debug, Clone)]
struct RegisteredAgent {
    vault_id: VaultId,
    signing_public_key: String,
    encryption_public_key: String,
    alias: Option<String>,
    registered_at: chrono::DateTime<chrono::Utc>,
}

/// A message held by the relay until its recipient acknowledges it.
#[derive(Debug, Clone)]
pub struct StoredMessage {
    pub message_id: String,
    pub source_vault_id: VaultId,
    pub destination: VaultId,
    pub payload: String,
    pub sent_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Default)]
struct RelayState {
    challenges: HashSet<String>,
    agents: HashMap<String, RegisteredAgent>,
    aliases: HashMap<String, String>,
    pending: HashMap<String, StoredMessage>,
    acked: HashMap<String, chrono::DateTime<chrono::Utc>>,
}

/// Cloneable handle to one shared in-memory relay.
#[derive(Clone, Default)]
pub struct MemoryRelay {
    state: Arc<Mutex<RelayState>>,
}

impl MemoryRelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn addr(&self) -> &'static str {
        MEMORY_RELAY_ADDR
    }

    /// Messages held for `vault_id` that have not been acknowledged.
    /// Inspection helper for tests; listing pending messages is not part
    /// of the client core.
    pub fn pending_for(&self, vault_id: &VaultId) -> Vec<StoredMessage> {
        let state = self.state.lock().expect("relay state poisoned");
        state
            .pending
            .values()
            .filter(|m| &m.destination == vault_id)
            .cloned()
            .collect()
    }

    /// Whether the relay still holds an unacknowledged copy of a message.
    pub fn holds(&self, message_id: &str) -> bool {
        let state = self.state.lock().expect("relay state poisoned");
        state.pending.contains_key(message_id)
    }

    /// Number of challenges issued but not yet consumed.
    pub fn outstanding_challenges(&self) -> usize {
        let state = self.state.lock().expect("relay state poisoned");
        state.challenges.len()
    }

    fn issue_challenge(&self) -> Value {
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let mut state = self.state.lock().expect("relay state poisoned");
        state.challenges.insert(nonce.clone());
        serde_json::json!({ "challenge": nonce })
    }

    fn register(&self, req: RegisterRequest) -> Result<Value, RelayError> {
        let mut state = self.state.lock().expect("relay state poisoned");

        // Challenge must be one the relay issued, and is consumed here
        // whether or not the rest of the request holds up.
        if !state.challenges.remove(&req.challenge) {
            return Err(server_error(
                "invalid_challenge",
                "unknown or already-used challenge".into(),
            ));
        }

        // The anti-hijacking check: the signature over the exact
        // challenge bytes must verify against the submitted public key,
        // and the claimed vault ID must derive from that key.
        let verifying = verifying_key_from_hex(&req.signing_public_key)
            .map_err(|e| server_error("invalid_key", e.to_string()))?;
        let signature = signature_from_hex(&req.signature)
            .map_err(|e| server_error("invalid_signature", e.to_string()))?;
        if verifying
            .verify_strict(req.challenge.as_bytes(), &signature)
            .is_err()
        {
            return Err(server_error(
                "invalid_signature",
                "signature does not verify against submitted key".into(),
            ));
        }
        if derive_vault_id(&verifying) != req.vault_id.as_str() {
            return Err(server_error(
                "invalid_vault_id",
                "vault ID does not derive from submitted key".into(),
            ));
        }

        if state.agents.contains_key(req.vault_id.as_str()) {
            return Err(server_error(
                CODE_ALREADY_REGISTERED,
                format!("{} is already registered", req.vault_id),
            ));
        }
        if let Some(alias) = &req.alias {
            if state.aliases.contains_key(alias) {
                return Err(server_error(
                    CODE_ALIAS_TAKEN,
                    format!("alias '{}' is held by another vault", alias),
                ));
            }
        }

        let agent = RegisteredAgent {
            vault_id: req.vault_id.clone(),
            signing_public_key: req.signing_public_key,
            encryption_public_key: req.encryption_public_key,
            alias: req.alias.clone(),
            registered_at: chrono::Utc::now(),
        };
        if let Some(alias) = &req.alias {
            state
                .aliases
                .insert(alias.clone(), req.vault_id.as_str().to_string());
        }
        let registered_at = agent.registered_at;
        state
            .agents
            .insert(req.vault_id.as_str().to_string(), agent);

        Ok(serde_json::json!({
            "vault_id": req.vault_id,
            "alias": req.alias,
            "registered_at": registered_at,
        }))
    }

    fn set_alias(&self, req: SetAliasRequest) -> Result<Value, RelayError> {
        let mut state = self.state.lock().expect("relay state poisoned");

        if !state.agents.contains_key(req.vault_id.as_str()) {
            return Err(server_error(
                "not_registered",
                format!("{} is not registered", req.vault_id),
            ));
        }
        if let Some(holder) = state.aliases.get(&req.alias) {
            if holder != req.vault_id.as_str() {
                return Err(server_error(
                    CODE_ALIAS_TAKEN,
                    format!("alias '{}' is held by another vault", req.alias),
                ));
            }
        }

        // Release the vault's previous alias, if any.
        let previous = state
            .agents
            .get(req.vault_id.as_str())
            .and_then(|a| a.alias.clone());
        if let Some(old) = previous {
            state.aliases.remove(&old);
        }
        state
            .aliases
            .insert(req.alias.clone(), req.vault_id.as_str().to_string());
        if let Some(agent) = state.agents.get_mut(req.vault_id.as_str()) {
            agent.alias = Some(req.alias.clone());
        }

        Ok(serde_json::json!({ "vault_id": req.vault_id, "alias": req.alias }))
    }

    fn resolve(&self, alias: &str) -> Result<Value, RelayError> {
        let state = self.state.lock().expect("relay state poisoned");
        let vault_id = state
            .aliases
            .get(alias)
            .ok_or_else(|| server_error(CODE_NOT_FOUND, format!("alias '{}' is unknown", alias)))?;
        let agent = state
            .agents
            .get(vault_id)
            .ok_or_else(|| server_error(CODE_NOT_FOUND, format!("alias '{}' is unknown", alias)))?;
        Ok(serde_json::json!({
            "alias": alias,
            "vault_id": agent.vault_id,
            "signing_public_key": agent.signing_public_key,
            "encryption_public_key": agent.encryption_public_key,
        }))
    }

    fn list_agents(&self, limit: usize) -> Value {
        let state = self.state.lock().expect("relay state poisoned");
        let agents: Vec<AgentDirectoryEntry> = state
            .agents
            .values()
            .take(limit)
            .map(|a| AgentDirectoryEntry {
                alias: a.alias.clone(),
                vault_id: a.vault_id.clone(),
                registered_at: a.registered_at,
            })
            .collect();
        serde_json::json!({ "agents": agents })
    }

    fn send(&self, req: SendRequest) -> Result<Value, RelayError> {
        let mut state = self.state.lock().expect("relay state poisoned");
        if !state.agents.contains_key(req.destination.as_str()) {
            return Err(server_error(
                CODE_NOT_FOUND,
                format!("destination {} is unknown", req.destination),
            ));
        }
        let message_id = uuid::Uuid::new_v4().to_string();
        state.pending.insert(
            message_id.clone(),
            StoredMessage {
                message_id: message_id.clone(),
                source_vault_id: req.source_vault_id,
                destination: req.destination,
                payload: req.payload,
                sent_at: chrono::Utc::now(),
            },
        );
        Ok(serde_json::json!({ "message_id": message_id }))
    }

    fn acknowledge(&self, req: AckRequest) -> Value {
        let mut state = self.state.lock().expect("relay state poisoned");
        // Idempotent: repeats return the original timestamp, unknown IDs
        // are acknowledged as of now rather than erroring.
        let acknowledged_at = if let Some(at) = state.acked.get(&req.message_id) {
            *at
        } else {
            let now = chrono::Utc::now();
            state.pending.remove(&req.message_id);
            state.acked.insert(req.message_id.clone(), now);
            now
        };
        serde_json::json!({
            "message_id": req.message_id,
            "acknowledged_at": acknowledged_at,
        })
    }
}

impl RelayTransport for MemoryRelay {
    fn get(&self, path: &str) -> Result<Value, RelayError> {
        if let Some(alias) = path.strip_prefix(&format!("{}/", EP_RESOLVE)) {
            return self.resolve(alias);
        }
        if let Some(query) = path.strip_prefix(&format!("{}?limit=", EP_AGENTS)) {
            let limit = query
                .parse::<usize>()
                .map_err(|_| server_error("bad_request", format!("bad limit: {}", query)))?;
            return Ok(self.list_agents(limit));
        }
        Err(server_error(CODE_NOT_FOUND, format!("no such endpoint: {}", path)))
    }

    fn post(&self, path: &str, body: &Value) -> Result<Value, RelayError> {
        match path {
            EP_CHALLENGE => Ok(self.issue_challenge()),
            EP_REGISTER => self.register(serde_json::from_value(body.clone())?),
            EP_ALIAS => self.set_alias(serde_json::from_value(body.clone())?),
            EP_MESSAGES => self.send(serde_json::from_value(body.clone())?),
            EP_ACK => Ok(self.acknowledge(serde_json::from_value(body.clone())?)),
            _ => Err(server_error(CODE_NOT_FOUND, format!("no such endpoint: {}", path))),
        }
    }
}

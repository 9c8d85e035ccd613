//! The relay protocol client.
//!
//! [`RelayClient`] covers the public operations (discovery, challenge
//! issuance) that need no local identity. [`AgentClient`] borrows a
//! loaded [`Vault`] on top of it and adds the authenticated operations:
//! registration, alias assignment, message send and acknowledgment.

use std::ops::Deref;

use serde_json::Value;

use vaultlink_protocol::{
    AckRequest, AckResponse, AgentDirectoryEntry, AgentsResponse, ChallengeResponse, PublicIdentity,
    RegisterRequest, RegisterResponse, RelayError, ResolveResponse, SendRequest, SendResponse,
    SetAliasRequest, SetAliasResponse, VaultId, CODE_ALREADY_REGISTERED, EP_ACK, EP_AGENTS,
    EP_ALIAS, EP_CHALLENGE, EP_MESSAGES, EP_REGISTER, EP_RESOLVE,
};
use vaultlink_vault::{ServerState, Vault};

use crate::config::RelayConfig;
use crate::transport::{HttpTransport, RelayTransport};

/// Outcome of a registration handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// The relay accepted the signed challenge and stored the identity.
    Registered {
        registered_at: chrono::DateTime<chrono::Utc>,
    },
    /// The relay already knew this vault ID. Treated as success; local
    /// server state is reconciled to registered.
    AlreadyRegistered,
}

/// Client for operations that need no local identity.
pub struct RelayClient<T: RelayTransport> {
    server: String,
    transport: T,
}

impl<T: RelayTransport> RelayClient<T> {
    /// `server` is the relay address used as the key in per-server vault
    /// state; for HTTP transports it is the base URL.
    pub fn new(server: impl Into<String>, transport: T) -> Self {
        Self {
            server: server.into(),
            transport,
        }
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    /// Request a fresh single-use challenge nonce from the relay.
    ///
    /// Challenges are never cached: every registration attempt starts
    /// here, and a consumed or abandoned challenge is simply dropped.
    pub fn get_challenge(&self) -> Result<String, RelayError> {
        let value = self
            .transport
            .post(EP_CHALLENGE, &Value::Object(Default::default()))
            .map_err(|e| match e {
                RelayError::Relay { message, .. } => RelayError::Challenge(message),
                other => other,
            })?;
        let resp: ChallengeResponse = serde_json::from_value(value)?;
        Ok(resp.challenge)
    }

    /// Look up a vault's public identity by alias.
    pub fn resolve(&self, alias: &str) -> Result<PublicIdentity, RelayError> {
        let value = self.transport.get(&format!("{}/{}", EP_RESOLVE, alias))?;
        let resp: ResolveResponse = serde_json::from_value(value)?;
        Ok(PublicIdentity {
            vault_id: resp.vault_id,
            signing_public_key: resp.signing_public_key,
            encryption_public_key: resp.encryption_public_key,
            alias: Some(resp.alias),
        })
    }

    /// Enumerate registered agents, up to `limit`. Ordering is
    /// relay-defined and must not be relied on.
    pub fn list_agents(&self, limit: usize) -> Result<Vec<AgentDirectoryEntry>, RelayError> {
        let value = self
            .transport
            .get(&format!("{}?limit={}", EP_AGENTS, limit))?;
        let resp: AgentsResponse = serde_json::from_value(value)?;
        Ok(resp.agents)
    }

    fn post_typed<R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl serde::Serialize,
    ) -> Result<R, RelayError> {
        let value = self.transport.post(path, &serde_json::to_value(body)?)?;
        Ok(serde_json::from_value(value)?)
    }
}

impl RelayClient<HttpTransport> {
    /// Connect to a relay over HTTP with the configured timeouts.
    pub fn connect(config: &RelayConfig) -> Result<Self, RelayError> {
        let transport = HttpTransport::new(
            &config.url,
            std::time::Duration::from_secs(config.connect_timeout_secs),
            std::time::Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(Self::new(config.url.clone(), transport))
    }
}

/// Client for operations authenticated by a loaded vault.
///
/// Derefs to [`RelayClient`], so the public operations stay available on
/// the same surface.
pub struct AgentClient<'v, T: RelayTransport> {
    relay: RelayClient<T>,
    vault: &'v mut Vault,
}

impl<'v, T: RelayTransport> Deref for AgentClient<'v, T> {
    type Target = RelayClient<T>;

    fn deref(&self) -> &Self::Target {
        &self.relay
    }
}

impl<'v, T: RelayTransport> AgentClient<'v, T> {
    pub fn new(relay: RelayClient<T>, vault: &'v mut Vault) -> Self {
        Self { relay, vault }
    }

    pub fn vault(&self) -> &Vault {
        self.vault
    }

    /// Run the registration handshake against this relay.
    ///
    /// Strict order, never reordered: (1) request a fresh challenge,
    /// (2) sign the exact challenge bytes with the vault's signing key,
    /// (3) submit public identity + challenge + signature in one request.
    /// The relay verifies the signature against the submitted public key
    /// before accepting; that check is the anti-hijacking guarantee.
    ///
    /// A relay that already knows this vault ID answers
    /// `already_registered`; that is reconciled into local state and
    /// reported as [`RegistrationOutcome::AlreadyRegistered`], not as an
    /// error. Local server state is written only after a confirmed
    /// response.
    pub fn register(&mut self, alias: Option<&str>) -> Result<RegistrationOutcome, RelayError> {
        let challenge = self.relay.get_challenge()?;
        let signature = self.vault.sign(challenge.as_bytes());

        let identity = self.vault.public_identity();
        let request = RegisterRequest {
            vault_id: identity.vault_id.clone(),
            signing_public_key: identity.signing_public_key,
            encryption_public_key: identity.encryption_public_key,
            challenge,
            signature: hex::encode(signature.to_bytes()),
            alias: alias.map(|a| a.to_string()).or(identity.alias),
        };

        match self.relay.post_typed::<RegisterResponse>(EP_REGISTER, &request) {
            Ok(resp) => {
                self.vault.set_server_state(
                    self.relay.server(),
                    ServerState::registered(resp.registered_at, resp.alias.clone()),
                )?;
                tracing::info!(
                    vault_id = %resp.vault_id,
                    server = %self.relay.server(),
                    alias = resp.alias.as_deref().unwrap_or(""),
                    "Registered with relay"
                );
                Ok(RegistrationOutcome::Registered {
                    registered_at: resp.registered_at,
                })
            }
            Err(RelayError::Relay { code, message }) if code == CODE_ALREADY_REGISTERED => {
                // The relay's stored key for this vault ID is not
                // re-verified here; the contract offers no lookup by
                // vault ID to check against.
                tracing::warn!(
                    vault_id = %identity.vault_id,
                    server = %self.relay.server(),
                    detail = %message,
                    "Relay reports vault already registered; reconciling local state"
                );
                let alias = self
                    .vault
                    .get_server_state(self.relay.server())
                    .and_then(|s| s.alias.clone());
                self.vault.set_server_state(
                    self.relay.server(),
                    ServerState {
                        registered: true,
                        registered_at: None,
                        alias,
                    },
                )?;
                Ok(RegistrationOutcome::AlreadyRegistered)
            }
            Err(RelayError::Relay { code, message }) => {
                Err(RelayError::Registration { code, message })
            }
            Err(other) => Err(other),
        }
    }

    /// Make sure this vault is registered with the relay, running the
    /// handshake if the local cache says it is not.
    pub fn ensure_registered(&mut self) -> Result<(), RelayError> {
        if self.vault.is_registered(self.relay.server()) {
            return Ok(());
        }
        self.register(None).map(|_| ())
    }

    /// Claim a human-readable alias on this relay. Aliases are unique per
    /// server; a name held by another vault fails with
    /// [`RelayError::AliasTaken`] and changes nothing.
    pub fn set_alias(&mut self, alias: &str) -> Result<(), RelayError> {
        self.ensure_registered()?;

        let request = SetAliasRequest {
            vault_id: self.vault.vault_id().clone(),
            alias: alias.to_string(),
        };
        let resp: SetAliasResponse = self.relay.post_typed(EP_ALIAS, &request)?;
        self.vault.set_alias_local(self.relay.server(), &resp.alias)?;
        tracing::info!(
            vault_id = %resp.vault_id,
            alias = %resp.alias,
            server = %self.relay.server(),
            "Alias set"
        );
        Ok(())
    }

    /// Send a message to a vault ID or an alias (resolved first).
    ///
    /// The payload travels verbatim: encrypting it to the destination's
    /// encryption public key is the caller's decision, made before this
    /// call. Returns the relay-assigned message ID.
    pub fn send(&mut self, destination: &str, payload: &str) -> Result<String, RelayError> {
        self.ensure_registered()?;

        let destination = if VaultId::is_valid_format(destination) {
            VaultId::new(destination.to_string())
        } else {
            self.relay.resolve(destination)?.vault_id
        };

        let request = SendRequest {
            destination: destination.clone(),
            payload: payload.to_string(),
            source_vault_id: self.vault.vault_id().clone(),
        };
        let resp: SendResponse = self.relay.post_typed(EP_MESSAGES, &request)?;
        tracing::debug!(
            message_id = %resp.message_id,
            destination = %destination,
            "Message handed to relay"
        );
        Ok(resp.message_id)
    }

    /// Confirm receipt of a message. The relay may discard it afterwards;
    /// a message counts as delivered only once this succeeds. Idempotent.
    pub fn acknowledge(&mut self, message_id: &str) -> Result<AckResponse, RelayError> {
        self.ensure_registered()?;

        let request = AckRequest {
            message_id: message_id.to_string(),
        };
        let resp: AckResponse = self.relay.post_typed(EP_ACK, &request)?;
        tracing::debug!(
            message_id = %resp.message_id,
            acknowledged_at = %resp.acknowledged_at,
            "Message acknowledged"
        );
        Ok(resp)
    }
}

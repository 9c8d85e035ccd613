use serde::{Deserialize, Serialize};

use crate::constants::VAULT_ID_PREFIX;

/// Unique identifier for a vault, the canonical address of an agent.
/// Format: did:vault:<sha256_hex_of_signing_public_key>
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VaultId(pub String);

impl VaultId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string has the did:vault:<64 hex chars> shape.
    /// Used to tell vault-ID destinations apart from aliases.
    pub fn is_valid_format(s: &str) -> bool {
        match s.strip_prefix(VAULT_ID_PREFIX) {
            Some(rest) => rest.len() == 64 && rest.chars().all(|c| c.is_ascii_hexdigit()),
            None => false,
        }
    }
}

impl std::fmt::Display for VaultId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of a vault's identity. Never carries private key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIdentity {
    pub vault_id: VaultId,
    /// Hex-encoded Ed25519 public key
    pub signing_public_key: String,
    /// Hex-encoded X25519 public key
    pub encryption_public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// One row of the relay's agent directory, as returned by the listing
/// endpoint. The full keys are obtained via alias resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDirectoryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub vault_id: VaultId,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use vaultlink_protocol::VaultId;

/// Last known registration outcome against one relay server.
///
/// Local cache only: it reflects the last confirmed server response, not
/// a live query. The relay may have purged its side independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerState {
    pub registered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registered_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

impl ServerState {
    pub fn registered(
        registered_at: chrono::DateTime<chrono::Utc>,
        alias: Option<String>,
    ) -> Self {
        Self {
            registered: true,
            registered_at: Some(registered_at),
            alias,
        }
    }
}

/// The persisted vault record. One per vault directory.
///
/// Private key material is stored hex-encoded here and zeroized when the
/// in-memory copy is dropped. The record itself never leaves the vault
/// directory; every client-facing export goes through
/// [`vaultlink_protocol::PublicIdentity`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRecord {
    pub vault_id: VaultId,
    /// Hex-encoded Ed25519 seed
    pub signing_private_key: String,
    /// Hex-encoded Ed25519 public key
    pub signing_public_key: String,
    /// Hex-encoded X25519 secret
    pub encryption_private_key: String,
    /// Hex-encoded X25519 public key
    pub encryption_public_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Relay server address -> registration state
    #[serde(default)]
    pub servers: BTreeMap<String, ServerState>,
}

impl Drop for VaultRecord {
    fn drop(&mut self) {
        self.signing_private_key.zeroize();
        self.encryption_private_key.zeroize();
    }
}

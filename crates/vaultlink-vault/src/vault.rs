use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use ed25519_dalek::{Signature, Signer, SigningKey};
use x25519_dalek::StaticSecret;

use vaultlink_protocol::crypto::{
    self, derive_vault_id, generate_encryption_keypair, generate_signing_keypair,
};
use vaultlink_protocol::{PublicIdentity, RelayError, VaultId, VAULT_RECORD_FILE};

use crate::lock::VaultLock;
use crate::record::{ServerState, VaultRecord};

/// A loaded vault: the sole identity of a local agent.
///
/// Constructed explicitly with a storage directory and passed by
/// reference to the protocol client; there is no ambient global vault.
/// The vault ID and signing public key never change after creation.
pub struct Vault {
    dir: PathBuf,
    record: VaultRecord,
    signing_key: SigningKey,
    encryption_secret: StaticSecret,
}

impl Vault {
    /// Whether a persisted vault record is present in `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(VAULT_RECORD_FILE).exists()
    }

    /// Create a fresh vault in `dir`.
    ///
    /// Fails with [`RelayError::VaultExists`] if a record is already
    /// present; overwriting an identity is destructive and must go
    /// through [`Vault::create_forced`]. The new vault is immediately
    /// usable without a reload.
    pub fn create(dir: &Path, alias: Option<&str>) -> Result<Self, RelayError> {
        if Self::exists(dir) {
            return Err(RelayError::VaultExists(dir.display().to_string()));
        }
        Self::create_unchecked(dir, alias)
    }

    /// Create a vault in `dir`, destroying any existing identity there.
    /// Irreversible: the old keypairs are gone once this returns.
    pub fn create_forced(dir: &Path, alias: Option<&str>) -> Result<Self, RelayError> {
        if Self::exists(dir) {
            tracing::warn!(
                dir = %dir.display(),
                "Overwriting existing vault; the old identity is destroyed"
            );
        }
        Self::create_unchecked(dir, alias)
    }

    fn create_unchecked(dir: &Path, alias: Option<&str>) -> Result<Self, RelayError> {
        fs::create_dir_all(dir)?;

        let signing_key = generate_signing_keypair();
        let (encryption_secret, encryption_public) = generate_encryption_keypair();
        let vault_id = VaultId::new(derive_vault_id(&signing_key.verifying_key()));

        let record = VaultRecord {
            vault_id: vault_id.clone(),
            signing_private_key: hex::encode(signing_key.to_bytes()),
            signing_public_key: hex::encode(signing_key.verifying_key().as_bytes()),
            encryption_private_key: hex::encode(encryption_secret.to_bytes()),
            encryption_public_key: hex::encode(encryption_public.as_bytes()),
            alias: alias.map(|a| a.to_string()),
            created_at: chrono::Utc::now(),
            servers: Default::default(),
        };
        write_record(dir, &record)?;

        tracing::info!(vault_id = %vault_id, dir = %dir.display(), "Created vault");

        Ok(Self {
            dir: dir.to_path_buf(),
            record,
            signing_key,
            encryption_secret,
        })
    }

    /// Load the vault persisted in `dir`.
    ///
    /// Fails with [`RelayError::VaultNotFound`] if no record exists.
    /// Must be called before any signing or relay operation when the
    /// vault was not created in this process.
    pub fn load(dir: &Path) -> Result<Self, RelayError> {
        let path = dir.join(VAULT_RECORD_FILE);
        if !path.exists() {
            return Err(RelayError::VaultNotFound(dir.display().to_string()));
        }
        let content = fs::read_to_string(&path)?;
        let record: VaultRecord = serde_json::from_str(&content)?;

        let signing_key = crypto::signing_key_from_hex(&record.signing_private_key)?;
        let encryption_secret = crypto::x25519_secret_from_hex(&record.encryption_private_key)?;

        // Corruption check: the stored ID must match the stored key.
        let derived = derive_vault_id(&signing_key.verifying_key());
        if derived != record.vault_id.as_str() {
            return Err(RelayError::InvalidKey(format!(
                "vault record is corrupted: stored ID {} does not match key-derived {}",
                record.vault_id, derived
            )));
        }

        tracing::debug!(vault_id = %record.vault_id, dir = %dir.display(), "Loaded vault");

        Ok(Self {
            dir: dir.to_path_buf(),
            record,
            signing_key,
            encryption_secret,
        })
    }

    /// The public identity view: vault ID, both public keys, alias.
    /// Never exposes private key material.
    pub fn public_identity(&self) -> PublicIdentity {
        PublicIdentity {
            vault_id: self.record.vault_id.clone(),
            signing_public_key: self.record.signing_public_key.clone(),
            encryption_public_key: self.record.encryption_public_key.clone(),
            alias: self.record.alias.clone(),
        }
    }

    pub fn vault_id(&self) -> &VaultId {
        &self.record.vault_id
    }

    pub fn alias(&self) -> Option<&str> {
        self.record.alias.as_deref()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sign arbitrary bytes with the vault's signing key.
    pub fn sign(&self, payload: &[u8]) -> Signature {
        self.signing_key.sign(payload)
    }

    /// Decrypt an envelope sealed to this vault's encryption key.
    pub fn open_payload(&self, envelope_hex: &str) -> Result<Vec<u8>, RelayError> {
        crypto::open_payload(&self.encryption_secret, envelope_hex)
    }

    // ── Per-server registration state (local cache only) ──

    pub fn is_registered(&self, server: &str) -> bool {
        self.record
            .servers
            .get(server)
            .map(|s| s.registered)
            .unwrap_or(false)
    }

    pub fn get_server_state(&self, server: &str) -> Option<&ServerState> {
        self.record.servers.get(server)
    }

    /// Record a confirmed registration outcome for `server` and persist.
    ///
    /// Called only after the relay acknowledged the state being written
    /// (or on the explicit already_registered reconciliation path).
    pub fn set_server_state(&mut self, server: &str, state: ServerState) -> Result<(), RelayError> {
        self.record.servers.insert(server.to_string(), state);
        write_record(&self.dir, &self.record)
    }

    /// Record a confirmed alias assignment on `server` and persist.
    pub fn set_alias_local(&mut self, server: &str, alias: &str) -> Result<(), RelayError> {
        self.record.alias = Some(alias.to_string());
        if let Some(state) = self.record.servers.get_mut(server) {
            state.alias = Some(alias.to_string());
        }
        write_record(&self.dir, &self.record)
    }
}

// Accessors for the protocol client. Private key material stays inside
// the workspace; it is never serialized to logs or client-facing output.
impl Vault {
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    pub fn encryption_secret(&self) -> &StaticSecret {
        &self.encryption_secret
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // No key material, not even public, to keep logs terse.
        f.debug_struct("Vault")
            .field("vault_id", &self.record.vault_id)
            .field("dir", &self.dir)
            .field("alias", &self.record.alias)
            .finish()
    }
}

/// Write the record under the directory lock, via a temp file and an
/// atomic rename, so a concurrent reader never sees a partial record.
fn write_record(dir: &Path, record: &VaultRecord) -> Result<(), RelayError> {
    let _lock = VaultLock::acquire(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, record)?;
    tmp.write_all(b"\n")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        tmp.as_file().set_permissions(perms)?;
    }

    tmp.persist(dir.join(VAULT_RECORD_FILE))
        .map_err(|e| RelayError::Io(e.error))?;
    Ok(())
}

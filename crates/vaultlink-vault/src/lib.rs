//! Vaultlink vault - the local, file-persisted identity of an agent.
//!
//! A vault owns one Ed25519 signing keypair, one X25519 encryption
//! keypair, the vault ID derived from the signing public key, an optional
//! alias, and the per-relay-server registration state. The record lives
//! in a single directory; writes take a scoped exclusive lock and land
//! via temp-file-then-atomic-rename so a concurrent reader never observes
//! a partial record.

pub mod record;
pub mod vault;

mod lock;

pub use record::{ServerState, VaultRecord};
pub use vault::Vault;

//! Shared harness: a vault in a temp directory plus a client wired to an
//! in-memory relay.

use tempfile::TempDir;

use vaultlink_client::{AgentClient, MemoryRelay, RelayClient};
use vaultlink_vault::Vault;

pub fn create_vault(alias: Option<&str>) -> (TempDir, Vault) {
    let dir = tempfile::tempdir().expect("tempdir");
    let vault = Vault::create(dir.path(), alias).expect("create vault");
    (dir, vault)
}

pub fn agent<'v>(relay: &MemoryRelay, vault: &'v mut Vault) -> AgentClient<'v, MemoryRelay> {
    AgentClient::new(RelayClient::new(relay.addr(), relay.clone()), vault)
}

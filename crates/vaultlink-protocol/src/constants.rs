/// Prefix for vault identifiers derived from the signing public key.
pub const VAULT_ID_PREFIX: &str = "did:vault:";

/// Protocol version string advertised during registration.
pub const PROTOCOL_VERSION: &str = "/vaultlink/1.0.0";

/// Error code returned when a vault ID is already known to the relay.
/// The client treats this as success after reconciling local state.
pub const CODE_ALREADY_REGISTERED: &str = "already_registered";

/// Error code returned when another vault holds the requested alias.
pub const CODE_ALIAS_TAKEN: &str = "alias_taken";

/// Error code returned when an alias resolves to no registered vault.
pub const CODE_NOT_FOUND: &str = "not_found";

/// Default request timeout for relay round trips, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout for relay round trips, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// File name of the persisted vault record inside a vault directory.
pub const VAULT_RECORD_FILE: &str = "vault.json";

/// File name of the exclusive lock taken around vault record writes.
pub const VAULT_LOCK_FILE: &str = "vault.lock";

// Relay endpoint paths. The relay is an HTTP-style request/response
// server; transport framing beyond these paths is out of scope.
pub const EP_CHALLENGE: &str = "/challenge";
pub const EP_REGISTER: &str = "/register";
pub const EP_ALIAS: &str = "/alias";
pub const EP_RESOLVE: &str = "/resolve";
pub const EP_AGENTS: &str = "/agents";
pub const EP_MESSAGES: &str = "/messages";
pub const EP_ACK: &str = "/messages/ack";

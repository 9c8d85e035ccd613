use serde::{Deserialize, Serialize};

use crate::identity::{AgentDirectoryEntry, VaultId};

/// Machine-readable error body returned by the relay on any failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Response from the challenge issuance endpoint. The challenge is an
/// opaque, single-use nonce; the client must never cache or reuse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

/// Registration request: public identity, the server-issued challenge,
/// and the Ed25519 signature over the exact challenge bytes, submitted
/// as one atomic request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub vault_id: VaultId,
    pub signing_public_key: String,
    pub encryption_public_key: String,
    pub challenge: String,
    pub signature: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub vault_id: VaultId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub registered_at: chrono::DateTime<chrono::Utc>,
}

/// Alias assignment, authenticated by the registered vault's ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAliasRequest {
    pub vault_id: VaultId,
    pub alias: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAliasResponse {
    pub vault_id: VaultId,
    pub alias: String,
}

/// Response from GET /resolve/{alias}.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveResponse {
    pub alias: String,
    pub vault_id: VaultId,
    pub signing_public_key: String,
    pub encryption_public_key: String,
}

/// Response from GET /agents?limit=N. Ordering is relay-defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsResponse {
    pub agents: Vec<AgentDirectoryEntry>,
}

/// Message submission. The payload is carried verbatim; encrypting it to
/// the destination's encryption key is the sender's decision, made before
/// this request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendRequest {
    pub destination: VaultId,
    pub payload: String,
    pub source_vault_id: VaultId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendResponse {
    pub message_id: String,
}

/// Explicit delivery acknowledgment. A message is delivered only once
/// this exchange succeeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckRequest {
    pub message_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckResponse {
    pub message_id: String,
    pub acknowledged_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_omits_missing_alias() {
        let req = RegisterRequest {
            vault_id: VaultId::new("did:vault:abc".into()),
            signing_public_key: "00".repeat(32),
            encryption_public_key: "11".repeat(32),
            challenge: "nonce".into(),
            signature: "22".repeat(64),
            alias: None,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("alias"));

        let parsed: RegisterRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.challenge, "nonce");
    }

    #[test]
    fn test_error_body_roundtrip() {
        let body: ErrorBody =
            serde_json::from_str(r#"{"code":"alias_taken","message":"held by another vault"}"#)
                .unwrap();
        assert_eq!(body.code, "alias_taken");
    }
}

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use sha2::{Digest, Sha256};
use x25519_dalek::{EphemeralSecret, PublicKey as X25519PublicKey, StaticSecret};

use crate::constants::VAULT_ID_PREFIX;
use crate::RelayError;

const X25519_KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Generate a new Ed25519 signing keypair.
pub fn generate_signing_keypair() -> SigningKey {
    let mut rng = rand::thread_rng();
    SigningKey::generate(&mut rng)
}

/// Generate a new X25519 keypair for payload encryption.
pub fn generate_encryption_keypair() -> (StaticSecret, X25519PublicKey) {
    let secret = StaticSecret::random_from_rng(rand::thread_rng());
    let public = X25519PublicKey::from(&secret);
    (secret, public)
}

/// Derive the vault ID from a signing public key.
/// Format: did:vault:<hex(sha256(pub_key))>
pub fn derive_vault_id(verifying_key: &VerifyingKey) -> String {
    let hash = Sha256::digest(verifying_key.as_bytes());
    format!("{}{}", VAULT_ID_PREFIX, hex::encode(hash))
}

/// Sign the exact challenge bytes issued by the relay.
///
/// The signature must cover the bytes as received; signing any derived or
/// truncated value breaks the registration anti-spoofing guarantee.
pub fn sign_challenge(signing_key: &SigningKey, challenge: &[u8]) -> Signature {
    signing_key.sign(challenge)
}

/// Verify a challenge signature against the signer's public key.
///
/// The client never verifies its own signatures in the live protocol
/// (the relay does), but the round trip must hold for the contract to work.
pub fn verify_signature(
    verifying_key: &VerifyingKey,
    challenge: &[u8],
    signature: &Signature,
) -> Result<(), RelayError> {
    verifying_key
        .verify(challenge, signature)
        .map_err(|e| RelayError::Signature(e.to_string()))
}

/// Encrypt a payload to a recipient's X25519 public key.
///
/// Ephemeral-static Diffie-Hellman: a fresh ephemeral keypair per call,
/// symmetric key = SHA-256(shared || ephemeral_pub || recipient_pub),
/// ChaCha20-Poly1305 with a random 12-byte nonce. The envelope is
/// hex(ephemeral_pub || nonce || ciphertext).
pub fn seal_payload(recipient: &X25519PublicKey, plaintext: &[u8]) -> Result<String, RelayError> {
    let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_pub = X25519PublicKey::from(&ephemeral);
    let shared = ephemeral.diffie_hellman(recipient);

    let key = derive_sealing_key(shared.as_bytes(), &ephemeral_pub, recipient);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

    let mut nonce_bytes = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| RelayError::Crypto(format!("encryption failed: {}", e)))?;

    let mut envelope = Vec::with_capacity(X25519_KEY_LEN + NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(ephemeral_pub.as_bytes());
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&ciphertext);
    Ok(hex::encode(envelope))
}

/// Decrypt an envelope produced by [`seal_payload`] with the recipient's
/// X25519 secret key.
pub fn open_payload(secret: &StaticSecret, envelope_hex: &str) -> Result<Vec<u8>, RelayError> {
    let envelope = hex::decode(envelope_hex)
        .map_err(|e| RelayError::Crypto(format!("invalid envelope hex: {}", e)))?;
    if envelope.len() < X25519_KEY_LEN + NONCE_LEN {
        return Err(RelayError::Crypto("envelope too short".into()));
    }

    let mut epk_bytes = [0u8; X25519_KEY_LEN];
    epk_bytes.copy_from_slice(&envelope[..X25519_KEY_LEN]);
    let ephemeral_pub = X25519PublicKey::from(epk_bytes);
    let nonce = Nonce::from_slice(&envelope[X25519_KEY_LEN..X25519_KEY_LEN + NONCE_LEN]);
    let ciphertext = &envelope[X25519_KEY_LEN + NONCE_LEN..];

    let recipient_pub = X25519PublicKey::from(secret);
    let shared = secret.diffie_hellman(&ephemeral_pub);
    let key = derive_sealing_key(shared.as_bytes(), &ephemeral_pub, &recipient_pub);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| RelayError::Crypto("decryption failed: bad key or tampered envelope".into()))
}

fn derive_sealing_key(
    shared: &[u8],
    ephemeral_pub: &X25519PublicKey,
    recipient_pub: &X25519PublicKey,
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(shared);
    hasher.update(ephemeral_pub.as_bytes());
    hasher.update(recipient_pub.as_bytes());
    hasher.finalize().into()
}

// ── Key material parsing ──

/// Parse an Ed25519 signing key from its hex-encoded 32-byte seed.
pub fn signing_key_from_hex(s: &str) -> Result<SigningKey, RelayError> {
    let bytes = decode_key_bytes(s, "signing private key")?;
    Ok(SigningKey::from_bytes(&bytes))
}

/// Parse an Ed25519 public key from hex.
pub fn verifying_key_from_hex(s: &str) -> Result<VerifyingKey, RelayError> {
    let bytes = decode_key_bytes(s, "signing public key")?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| RelayError::InvalidKey(e.to_string()))
}

/// Parse an X25519 secret key from hex.
pub fn x25519_secret_from_hex(s: &str) -> Result<StaticSecret, RelayError> {
    let bytes = decode_key_bytes(s, "encryption private key")?;
    Ok(StaticSecret::from(bytes))
}

/// Parse an X25519 public key from hex.
pub fn x25519_public_from_hex(s: &str) -> Result<X25519PublicKey, RelayError> {
    let bytes = decode_key_bytes(s, "encryption public key")?;
    Ok(X25519PublicKey::from(bytes))
}

/// Parse a 64-byte Ed25519 signature from hex.
pub fn signature_from_hex(s: &str) -> Result<Signature, RelayError> {
    let bytes =
        hex::decode(s).map_err(|e| RelayError::Signature(format!("invalid signature hex: {}", e)))?;
    let arr: [u8; 64] = bytes
        .try_into()
        .map_err(|_| RelayError::Signature("signature must be 64 bytes".into()))?;
    Ok(Signature::from_bytes(&arr))
}

fn decode_key_bytes(s: &str, what: &str) -> Result<[u8; 32], RelayError> {
    let bytes = hex::decode(s)
        .map_err(|e| RelayError::InvalidKey(format!("{}: invalid hex: {}", what, e)))?;
    bytes
        .try_into()
        .map_err(|_| RelayError::InvalidKey(format!("{}: must be 32 bytes", what)))
}

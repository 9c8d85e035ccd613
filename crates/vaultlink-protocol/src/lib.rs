//! Vaultlink - Core types and wire definitions
//!
//! Implements the shared vocabulary of the Vaultlink relay protocol:
//! vault identities, the relay wire contract, and the Ed25519/X25519
//! primitives used for challenge signing and payload sealing.

pub mod constants;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod wire;

pub use constants::*;
pub use error::*;
pub use identity::*;
pub use wire::*;

//! Vaultlink relay client.
//!
//! Drives the wire protocol against a relay server: challenge-response
//! registration, alias assignment and resolution, message send and
//! acknowledgment, and peer discovery. Public (unauthenticated) and
//! authenticated operations live on the same client surface, split by
//! type rather than by ad hoc code paths: [`RelayClient`] needs no vault,
//! [`AgentClient`] borrows a loaded one.

pub mod client;
pub mod config;
pub mod logging;
pub mod memory;
pub mod transport;

pub use client::{AgentClient, RegistrationOutcome, RelayClient};
pub use config::ClientConfig;
pub use memory::MemoryRelay;
pub use transport::{HttpTransport, RelayTransport};

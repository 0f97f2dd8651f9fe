//! Vertex Crypto - Cryptographic primitives for the VERTEX consensus core.
//!
//! Provides the Blake2b-256 digest used for signed candidate bytes and
//! ed25519 keypairs/verification for the genesis approval ceremony.

pub mod ed25519;
pub mod error;
pub mod hash;

pub use ed25519::{verify, Keypair, ALGORITHM_ED25519};
pub use error::CryptoError;
pub use hash::blake2b256;

use crate::error::CryptoError;
use ed25519_dalek::{Signer, Verifier};
use rand::rngs::OsRng;
use std::fmt;
use vertex_types::ValidatorId;

/// Algorithm tag carried by ceremony signatures. Exact match required.
pub const ALGORITHM_ED25519: &str = "ed25519";

/// Ed25519 keypair used by trusted validators to sign the genesis candidate.
pub struct Keypair {
    signing_key: ed25519_dalek::SigningKey,
}

impl Keypair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let mut csprng = OsRng;
        let signing_key = ed25519_dalek::SigningKey::generate(&mut csprng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = ed25519_dalek::SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the public key as a validator identity
    pub fn public(&self) -> ValidatorId {
        ValidatorId::from_bytes(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message, returning the 64-byte detached signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.public())
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

/// Verify an ed25519 signature over `message` by `public_key`.
pub fn verify(
    public_key: &ValidatorId,
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let pk = ed25519_dalek::VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|_| CryptoError::InvalidPublicKey)?;
    let sig = ed25519_dalek::Signature::from_slice(signature)
        .map_err(|_| CryptoError::InvalidSignatureLength(signature.len()))?;
    pk.verify(message, &sig)
        .map_err(|_| CryptoError::VerificationFailed)
}

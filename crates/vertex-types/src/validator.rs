use crate::error::TypesError;
use std::fmt;

/// Validator identity: a 32-byte ed25519 public key.
///
/// The genesis block has no author; it carries an empty validator field,
/// which is modelled as `Option<ValidatorId>` at the block level rather
/// than a sentinel value here.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ValidatorId([u8; 32]);

impl ValidatorId {
    pub const LEN: usize = 32;

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create from a byte slice
    pub fn from_slice(slice: &[u8]) -> Result<Self, TypesError> {
        if slice.len() != 32 {
            return Err(TypesError::InvalidPublicKeyLength(slice.len()));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(slice);
        Ok(Self(bytes))
    }

    /// Parse a block-level validator field: empty means no author (genesis),
    /// 32 bytes is an identity, anything else is malformed.
    pub fn from_block_field(field: &[u8]) -> Result<Option<Self>, TypesError> {
        match field.len() {
            0 => Ok(None),
            32 => Ok(Some(Self::from_slice(field)?)),
            n => Err(TypesError::MalformedValidator(n)),
        }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl fmt::Debug for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidatorId(0x{}...)", &hex::encode(&self.0[..4]))
    }
}

impl AsRef<[u8]> for ValidatorId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

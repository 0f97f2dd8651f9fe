use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};

type Blake2b256 = Blake2b<U32>;

/// Compute the Blake2b-256 digest of `data`.
///
/// This is the digest signed during the genesis approval ceremony.
pub fn blake2b256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the Blake2b-256 digest of multiple data slices.
pub fn blake2b256_multi(data: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for chunk in data {
        hasher.update(chunk);
    }
    hasher.finalize().into()
}

use std::hash::Hasher;
use twox_hash::XxHash64;

/// XXH64 of a key with seed 0, stable across runs and platforms so that a
/// key always lands on the same page of an existing page file.
pub fn hash(key: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(key);
    hasher.finish()
}

mod hash_algorithm;
mod hash_cache;

pub use hash_algorithm::{HashAlgorithm, UnknownHashAlgorithmError};
pub use hash_cache::HashCache;

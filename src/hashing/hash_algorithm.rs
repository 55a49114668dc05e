use std::hash::Hasher;
use std::str::FromStr;

use bincode::{Decode, Encode};
use derive_more::Display;
use metrohash::MetroHash64;
use sha1::{Digest, Sha1};
use snafu::Snafu;

/// Digest used for the `hash` field of snapshot files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, Encode, Decode)]
pub enum HashAlgorithm {
    /// SHA-1, lowercase hex. What update clients verify downloads against.
    #[default]
    #[display("sha1")]
    Sha1,
    /// 64-bit MetroHash, 16 hex digits. Much cheaper, not collision resistant.
    #[display("metro64")]
    Metro64,
}

impl HashAlgorithm {
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha1 => hex::encode(Sha1::digest(bytes)),
            HashAlgorithm::Metro64 => {
                let mut hasher = MetroHash64::default();
                hasher.write(bytes);
                format!("{:016x}", hasher.finish())
            }
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnknownHashAlgorithmError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(HashAlgorithm::Sha1),
            "metro64" | "metrohash" => Ok(HashAlgorithm::Metro64),
            _ => UnknownHashAlgorithmSnafu { value }.fail(),
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(display("Unknown hash algorithm '{value}', expected 'sha1' or 'metro64'"))]
pub struct UnknownHashAlgorithmError {
    value: String,
}

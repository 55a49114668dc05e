//! Wire and storage encodings of a [`VirtualTree`].
//!
//! Clients receive JSON: an array of `{name, children}` directory records and
//! `{name, length, hash, modified}` file records. The persisted cache uses the
//! same record shape, tagged with the hash algorithm, bincode-encoded and
//! zstd-compressed.

use bincode::config;
use bincode::{Decode, Encode};
use snafu::{ResultExt, Snafu, ensure};

use crate::hashing::HashAlgorithm;
use crate::snapshot::VirtualTree;

const ZSTD_LEVEL: i32 = 3;

/// A tree as written to disk. `algorithm` produced every `hash` in `tree`.
#[derive(Debug, Clone, PartialEq, Eq, Encode, Decode)]
pub struct PersistedSnapshot {
    pub algorithm: HashAlgorithm,
    pub tree: VirtualTree,
}

pub fn to_json(tree: &VirtualTree) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(tree).context(JsonSnafu)
}

pub fn from_json(bytes: &[u8]) -> Result<VirtualTree, CodecError> {
    serde_json::from_slice(bytes).context(JsonSnafu)
}

pub fn to_binary(snapshot: &PersistedSnapshot) -> Result<Vec<u8>, CodecError> {
    let encoded = bincode::encode_to_vec(snapshot, config::standard()).context(EncodeSnafu)?;
    zstd::encode_all(encoded.as_slice(), ZSTD_LEVEL).context(CompressSnafu)
}

pub fn from_binary(bytes: &[u8]) -> Result<PersistedSnapshot, CodecError> {
    let decompressed = zstd::decode_all(bytes).context(DecompressSnafu)?;
    let (snapshot, read) =
        bincode::decode_from_slice::<PersistedSnapshot, _>(&decompressed, config::standard())
            .context(DecodeSnafu)?;
    ensure!(
        read == decompressed.len(),
        TrailingBytesSnafu {
            count: decompressed.len() - read
        }
    );
    Ok(snapshot)
}

#[derive(Debug, Snafu)]
pub enum CodecError {
    #[snafu(display("Snapshot is not valid JSON"))]
    JsonError { source: serde_json::Error },
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError {
        source: bincode::error::EncodeError,
    },
    #[snafu(display("Failed to decode snapshot"))]
    DecodeError {
        source: bincode::error::DecodeError,
    },
    #[snafu(display("Failed to compress snapshot"))]
    CompressError { source: std::io::Error },
    #[snafu(display("Failed to decompress snapshot"))]
    DecompressError { source: std::io::Error },
    #[snafu(display("Snapshot has {count} unexpected trailing bytes"))]
    TrailingBytes { count: usize },
}

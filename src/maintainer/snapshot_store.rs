use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use snafu::{ResultExt, Snafu, ensure};
use tracing::debug;

use crate::hashing::HashAlgorithm;
use crate::snapshot::{CodecError, PersistedSnapshot, TreeError, VirtualTree, codec};

/// Location of the persisted snapshot between runs.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted snapshot. A missing file is `Ok(None)`. Anything
    /// that cannot be decoded, breaks the tree invariants or was hashed with
    /// another algorithm than `algorithm` is an error.
    pub fn load(
        &self,
        algorithm: HashAlgorithm,
    ) -> Result<Option<VirtualTree>, SnapshotStoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("No persisted snapshot at {}", self.path.display());
                return Ok(None);
            }
            Err(err) => {
                return Err(err).context(ReadSnafu {
                    path: self.path.clone(),
                });
            }
        };

        let PersistedSnapshot {
            algorithm: stored,
            tree,
        } = codec::from_binary(&bytes).context(CorruptSnafu {
            path: self.path.clone(),
        })?;
        ensure!(
            stored == algorithm,
            AlgorithmMismatchSnafu {
                path: self.path.clone(),
                stored,
                expected: algorithm,
            }
        );
        tree.validate().context(InvalidSnafu {
            path: self.path.clone(),
        })?;

        debug!(
            "Loaded snapshot with {} files from {}",
            tree.file_count(),
            self.path.display()
        );
        Ok(Some(tree))
    }

    /// Writes the snapshot next to its final location first and renames it
    /// into place, so a crash never leaves a half-written file behind.
    pub fn save(
        &self,
        tree: &VirtualTree,
        algorithm: HashAlgorithm,
    ) -> Result<(), SnapshotStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context(CreateDirSnafu {
                    path: parent.to_path_buf(),
                })?;
            }
        }

        let snapshot = PersistedSnapshot {
            algorithm,
            tree: tree.clone(),
        };
        let bytes = codec::to_binary(&snapshot).context(EncodeSnafu)?;
        let staging = self.path.with_extension("partial");
        fs::write(&staging, bytes).context(WriteSnafu {
            path: staging.clone(),
        })?;
        fs::rename(&staging, &self.path).context(WriteSnafu {
            path: self.path.clone(),
        })?;

        debug!("Persisted snapshot to {}", self.path.display());
        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum SnapshotStoreError {
    #[snafu(display("Failed to read snapshot file {}", path.display()))]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Snapshot file {} is corrupt", path.display()))]
    CorruptError { path: PathBuf, source: CodecError },
    #[snafu(display("Snapshot file {} violates tree invariants", path.display()))]
    InvalidError { path: PathBuf, source: TreeError },
    #[snafu(display(
        "Snapshot file {} holds {stored} hashes, {expected} is configured",
        path.display()
    ))]
    AlgorithmMismatchError {
        path: PathBuf,
        stored: HashAlgorithm,
        expected: HashAlgorithm,
    },
    #[snafu(display("Failed to create snapshot directory {}", path.display()))]
    CreateDirError {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to encode snapshot"))]
    EncodeError { source: CodecError },
    #[snafu(display("Failed to write snapshot file {}", path.display()))]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

use std::fs::File;
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::ext::RelativePathExt;
use crate::filesystem::RealFileSystem;
use crate::maintainer::{CacheMaintainer, CycleReport, SnapshotStore};
use crate::snapshot::{CodecError, codec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServingMode {
    /// Every read runs a maintenance cycle and serializes its result.
    #[default]
    Fresh,
    /// Reads return the bytes published by the last `regenerate`.
    Performance,
}

/// What clients of the update server talk to: the snapshot JSON, the files it
/// describes and the index document.
pub struct SnapshotService {
    /// Held for the whole load, diff, patch, persist and publish sequence.
    /// Regenerations never interleave and no reader observes a half-patched
    /// tree.
    maintainer: Mutex<CacheMaintainer>,
    /// Swapped only while `maintainer` is held. Performance-mode readers load
    /// it without locking.
    published: ArcSwapOption<Vec<u8>>,
    mode: ServingMode,
    resources: RealFileSystem,
    index: serde_json::Map<String, serde_json::Value>,
}

impl SnapshotService {
    pub fn new(
        maintainer: CacheMaintainer,
        resources: RealFileSystem,
        mode: ServingMode,
        index: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        Self {
            maintainer: Mutex::new(maintainer),
            published: ArcSwapOption::empty(),
            mode,
            resources,
            index,
        }
    }

    /// Wires the service for `root` as described by its config file.
    pub fn from_config(root: &Path, config: &ServerConfig) -> Self {
        let resources = RealFileSystem::new(root.join(&config.resource_dir));
        let store = SnapshotStore::new(root.join(&config.snapshot_file));
        let maintainer = CacheMaintainer::new(
            Arc::new(resources.clone()),
            store,
            config.hash_algorithm,
        )
        .with_restamp(config.restamp_modified);
        let mode = if config.performance_mode {
            ServingMode::Performance
        } else {
            ServingMode::Fresh
        };
        debug!(
            "Serving {} in {:?} mode with {} hashes",
            resources.base().display(),
            mode,
            config.hash_algorithm
        );

        Self::new(maintainer, resources, mode, config.index_document())
    }

    /// Runs one maintenance cycle. In performance mode the result is
    /// serialized and published before the lock is released.
    pub fn regenerate(&self) -> Result<CycleReport, ServiceError> {
        let maintainer = self.maintainer.lock();
        let (tree, report) = maintainer.run_cycle();
        if self.mode == ServingMode::Performance {
            let bytes = codec::to_json(&tree).context(EncodeSnafu)?;
            debug!("Publishing snapshot of {} bytes", bytes.len());
            self.published.store(Some(Arc::new(bytes)));
        }
        info!(
            "Regenerated snapshot: {} files, {} changes",
            report.file_count,
            report.difference.total()
        );
        Ok(report)
    }

    /// The JSON snapshot clients download.
    pub fn current_snapshot_bytes(&self) -> Result<Arc<Vec<u8>>, ServiceError> {
        match self.mode {
            ServingMode::Performance => self.published.load_full().context(NotPublishedSnafu),
            ServingMode::Fresh => {
                let maintainer = self.maintainer.lock();
                let (tree, _) = maintainer.run_cycle();
                let bytes = codec::to_json(&tree).context(EncodeSnafu)?;
                Ok(Arc::new(bytes))
            }
        }
    }

    /// Opens a file below the resource directory for streaming.
    pub fn lookup_file(&self, relative_path: &str) -> Result<FileStream, LookupError> {
        ensure!(
            !is_escaping(relative_path),
            ForbiddenSnafu {
                path: relative_path
            }
        );
        let resolved = self.resources.resolve(relative_path);
        let metadata = match std::fs::symlink_metadata(&resolved) {
            Ok(metadata) if metadata.file_type().is_symlink() => {
                debug!("Refusing to serve symbolic link {}", resolved.display());
                return NotFoundSnafu {
                    path: relative_path,
                }
                .fail();
            }
            Ok(metadata) => metadata,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return NotFoundSnafu {
                    path: relative_path,
                }
                .fail();
            }
            Err(err) => return Err(err).context(OpenSnafu { path: resolved }),
        };
        ensure!(
            !metadata.is_dir(),
            IsDirectorySnafu {
                path: relative_path
            }
        );

        let file = File::open(&resolved).context(OpenSnafu {
            path: resolved.clone(),
        })?;
        debug!("Streaming {} ({} bytes)", resolved.display(), metadata.len());
        Ok(FileStream {
            file,
            length: metadata.len(),
        })
    }

    /// The index document as JSON: `update` plus the non-reserved config keys,
    /// in sorted key order.
    pub fn index_document(&self) -> Result<Vec<u8>, ServiceError> {
        serde_json::to_vec(&self.index).context(IndexEncodeSnafu)
    }
}

/// Absolute paths, drive prefixes and `..` segments leave the resource
/// directory.
fn is_escaping(relative_path: &str) -> bool {
    relative_path.starts_with(['/', '\\'])
        || relative_path.contains(':')
        || relative_path.path_segments().contains(&"..")
}

/// An open resource file and its size.
#[derive(Debug)]
pub struct FileStream {
    file: File,
    length: u64,
}

impl FileStream {
    pub fn length(&self) -> u64 {
        self.length
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

#[derive(Debug, Snafu)]
pub enum ServiceError {
    #[snafu(display("Failed to serialize snapshot"))]
    EncodeError { source: CodecError },
    #[snafu(display("Failed to serialize index document"))]
    IndexEncodeError { source: serde_json::Error },
    #[snafu(display("No snapshot has been published yet"))]
    NotPublished,
}

#[derive(Debug, Snafu)]
pub enum LookupError {
    #[snafu(display("Path '{path}' points outside the resource directory"))]
    Forbidden { path: String },
    #[snafu(display("No resource at '{path}'"))]
    NotFound { path: String },
    #[snafu(display("'{path}' is a directory"))]
    IsDirectory { path: String },
    #[snafu(display("Failed to open {}", path.display()))]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

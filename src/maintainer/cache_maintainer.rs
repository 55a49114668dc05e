use std::cmp::Reverse;
use std::sync::Arc;
use std::time::{Duration, Instant};

use snafu::Report;
use tracing::{debug, error, info, warn};

use crate::diff::{DiffEngine, Difference};
use crate::ext::RelativePathExt;
use crate::filesystem::{EntryKind, FileSystemView};
use crate::hashing::{HashAlgorithm, HashCache};
use crate::maintainer::SnapshotStore;
use crate::snapshot::{VirtualNode, VirtualTree};

/// Outcome of one maintenance cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub difference: Difference,
    /// The persisted snapshot was missing or unusable and the directory was
    /// scanned from scratch.
    pub rescanned: bool,
    pub persisted: bool,
    pub file_count: usize,
    pub elapsed: Duration,
}

/// Keeps the persisted snapshot of one directory in step with the directory.
pub struct CacheMaintainer {
    fs: Arc<dyn FileSystemView>,
    store: SnapshotStore,
    algorithm: HashAlgorithm,
    restamp: bool,
}

impl CacheMaintainer {
    pub fn new(fs: Arc<dyn FileSystemView>, store: SnapshotStore, algorithm: HashAlgorithm) -> Self {
        Self {
            fs,
            store,
            algorithm,
            restamp: true,
        }
    }

    pub fn with_restamp(mut self, restamp: bool) -> Self {
        self.restamp = restamp;
        self
    }

    /// Loads the persisted snapshot, brings it up to date with the directory
    /// and persists it again when anything changed.
    pub fn run_cycle(&self) -> (VirtualTree, CycleReport) {
        let started = Instant::now();
        let mut hashes = HashCache::new(self.fs.clone());

        let loaded = self.store.load(self.algorithm).unwrap_or_else(|err| {
            warn!("Discarding persisted snapshot: {}", Report::from_error(err));
            None
        });

        let (tree, difference, rescanned) = match loaded {
            Some(mut tree) => {
                let difference = DiffEngine::new(self.fs.as_ref(), &mut hashes, self.algorithm)
                    .with_restamp(self.restamp)
                    .compare(&tree);
                self.apply(&mut tree, &difference, &mut hashes);
                (tree, difference, false)
            }
            None => {
                info!("Building snapshot from a full scan");
                let tree =
                    VirtualTree::from_file_system(self.fs.as_ref(), &mut hashes, self.algorithm);
                (tree, Difference::default(), true)
            }
        };

        let persisted = if rescanned || difference.has_differences() {
            match self.store.save(&tree, self.algorithm) {
                Ok(()) => true,
                Err(err) => {
                    error!("Snapshot was not persisted: {}", Report::from_error(err));
                    false
                }
            }
        } else {
            debug!("Snapshot unchanged, skipping write");
            false
        };

        let report = CycleReport {
            file_count: tree.file_count(),
            difference,
            rescanned,
            persisted,
            elapsed: started.elapsed(),
        };
        info!(
            "Snapshot cycle finished in {:?}: {} files, {} changes, {} hashes computed",
            report.elapsed,
            report.file_count,
            report.difference.total(),
            hashes.len()
        );
        (tree, report)
    }

    /// Patches `tree` in place. Removals run deepest path first and insertions
    /// shallowest first, so parents exist whenever a child is touched.
    fn apply(&self, tree: &mut VirtualTree, difference: &Difference, hashes: &mut HashCache) {
        let mut removals: Vec<&String> = difference
            .old_files
            .iter()
            .chain(&difference.old_folders)
            .collect();
        removals.sort_by_key(|path| Reverse(path.path_depth()));
        for path in removals {
            if let Err(err) = tree.remove_node(path) {
                debug!("Skipping removal of {path}: {err}");
            }
        }

        let mut folders: Vec<&String> = difference.new_folders.iter().collect();
        folders.sort_by_key(|path| path.path_depth());
        for path in folders {
            let (parent, name) = path.split_parent();
            if let Err(err) = tree.insert(parent, VirtualNode::directory(name, Vec::new())) {
                warn!("Could not add folder {path} to the snapshot: {err}");
            }
        }

        let mut files: Vec<&String> = difference.new_files.iter().collect();
        files.sort_by_key(|path| path.path_depth());
        for path in files {
            let Some(node) = self.capture_file(path, hashes) else {
                warn!("{path} disappeared before it could be added to the snapshot");
                continue;
            };
            let (parent, _) = path.split_parent();
            match tree.insert(parent, node) {
                Ok(()) => info!("Detected change, snapshot updated: {path}"),
                Err(err) => warn!("Could not add file {path} to the snapshot: {err}"),
            }
        }
    }

    fn capture_file(&self, path: &str, hashes: &mut HashCache) -> Option<VirtualNode> {
        let stat = self.fs.stat(path).filter(|stat| stat.kind == EntryKind::File)?;
        let hash = hashes.get_hash(path, self.algorithm)?;
        let (_, name) = path.split_parent();
        Some(VirtualNode::file(name, stat.length, hash, stat.modified))
    }
}

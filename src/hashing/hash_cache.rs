use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::filesystem::FileSystemView;
use crate::hashing::HashAlgorithm;

/// Per-session memo of file digests, keyed by algorithm and relative path.
///
/// A cache is bound to one base directory and lives for one maintenance
/// cycle. Once a digest is computed it is never recomputed or invalidated.
pub struct HashCache {
    fs: Arc<dyn FileSystemView>,
    entries: HashMap<(HashAlgorithm, String), String>,
}

impl HashCache {
    pub fn new(fs: Arc<dyn FileSystemView>) -> Self {
        Self {
            fs,
            entries: HashMap::new(),
        }
    }

    /// Returns the digest of the file at `relative_path`, reading it on first
    /// access. `None` means the file could not be read; nothing is cached then.
    pub fn get_hash(&mut self, relative_path: &str, algorithm: HashAlgorithm) -> Option<String> {
        let key = (algorithm, relative_path.to_string());
        if let Some(hash) = self.entries.get(&key) {
            return Some(hash.clone());
        }

        let bytes = self.fs.read_bytes(relative_path)?;
        let hash = algorithm.digest(&bytes);
        debug!("Hashed {relative_path} ({algorithm}): {hash}");
        self.entries.insert(key, hash.clone());
        Some(hash)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

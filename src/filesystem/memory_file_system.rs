use std::collections::HashSet;

use hashlink::LinkedHashMap;
use parking_lot::Mutex;

use crate::ext::{RelativePathExt, join_relative};
use crate::filesystem::{EntryKind, EntryStat, FileSystemView};

#[derive(Debug, Clone)]
enum MemoryEntry {
    Directory,
    File { bytes: Vec<u8>, modified: i64 },
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: LinkedHashMap<String, MemoryEntry>,
    unreadable: HashSet<String>,
    reads: Vec<String>,
    restamps: Vec<(String, i64)>,
}

/// In-memory `FileSystemView` that records reads and restamps, so tests can
/// assert which files were hashed and touched.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    state: Mutex<MemoryState>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: &str, bytes: &[u8], modified: i64) -> Self {
        self.put_file(path, bytes, modified);
        self
    }

    pub fn with_dir(self, path: &str) -> Self {
        self.put_dir(path);
        self
    }

    pub fn put_dir(&self, path: &str) {
        let mut state = self.state.lock();
        let mut current = String::new();
        for segment in path.path_segments() {
            current = join_relative(&current, segment);
            state
                .entries
                .entry(current.clone())
                .or_insert(MemoryEntry::Directory);
        }
    }

    pub fn put_file(&self, path: &str, bytes: &[u8], modified: i64) {
        let (parent, _) = path.split_parent();
        self.put_dir(parent);
        self.state.lock().entries.insert(
            path.to_string(),
            MemoryEntry::File {
                bytes: bytes.to_vec(),
                modified,
            },
        );
    }

    /// Removes an entry and everything below it.
    pub fn remove(&self, path: &str) {
        let prefix = format!("{path}/");
        let mut state = self.state.lock();
        let doomed: Vec<String> = state
            .entries
            .keys()
            .filter(|key| *key == path || key.starts_with(&prefix))
            .cloned()
            .collect();
        for key in doomed {
            state.entries.remove(&key);
        }
    }

    /// Makes `read_bytes` fail for `path` while `stat` keeps reporting it.
    pub fn deny_reads(&self, path: &str) {
        self.state.lock().unreadable.insert(path.to_string());
    }

    pub fn reads(&self) -> Vec<String> {
        self.state.lock().reads.clone()
    }

    pub fn restamps(&self) -> Vec<(String, i64)> {
        self.state.lock().restamps.clone()
    }
}

impl FileSystemView for MemoryFileSystem {
    fn list(&self, directory: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .entries
            .keys()
            .filter(|key| key.split_parent().0 == directory)
            .map(|key| key.split_parent().1.to_string())
            .collect()
    }

    fn stat(&self, path: &str) -> Option<EntryStat> {
        match self.state.lock().entries.get(path)? {
            MemoryEntry::Directory => Some(EntryStat {
                kind: EntryKind::Directory,
                length: 0,
                modified: 0,
            }),
            MemoryEntry::File { bytes, modified } => Some(EntryStat {
                kind: EntryKind::File,
                length: bytes.len() as u64,
                modified: *modified,
            }),
        }
    }

    fn read_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let mut state = self.state.lock();
        state.reads.push(path.to_string());
        if state.unreadable.contains(path) {
            return None;
        }
        match state.entries.get(path)? {
            MemoryEntry::File { bytes, .. } => Some(bytes.clone()),
            MemoryEntry::Directory => None,
        }
    }

    fn set_modified(&self, path: &str, modified: i64) -> bool {
        let mut state = self.state.lock();
        state.restamps.push((path.to_string(), modified));
        match state.entries.get_mut(path) {
            Some(MemoryEntry::File { modified: stamp, .. }) => {
                *stamp = modified;
                true
            }
            _ => false,
        }
    }
}

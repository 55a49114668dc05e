use std::fs;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use tracing::{debug, warn};

use crate::ext::{RelativePathExt, SystemTimeExt, system_time_from_unix_millis};
use crate::filesystem::{EntryKind, EntryStat, FileSystemView};

/// `FileSystemView` over a real directory.
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    base: PathBuf,
}

impl RealFileSystem {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolves a relative path against the base directory. Segments are
    /// joined one by one so that `\` separators also work on Unix.
    pub fn resolve(&self, path: &str) -> PathBuf {
        path.path_segments()
            .into_iter()
            .fold(self.base.clone(), |resolved, segment| resolved.join(segment))
    }
}

impl FileSystemView for RealFileSystem {
    fn list(&self, directory: &str) -> Vec<String> {
        let resolved = self.resolve(directory);
        let entries = match fs::read_dir(&resolved) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Cannot list {}: {err}", resolved.display());
                return Vec::new();
            }
        };

        entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.file_name()),
                Err(err) => {
                    debug!("Skipping unreadable entry in {}: {err}", resolved.display());
                    None
                }
            })
            .filter_map(|name| match name.into_string() {
                Ok(name) => Some(name),
                Err(raw) => {
                    warn!(
                        "Skipping entry with non UTF-8 name {:?} in {}",
                        raw,
                        resolved.display()
                    );
                    None
                }
            })
            .collect()
    }

    fn stat(&self, path: &str) -> Option<EntryStat> {
        let resolved = self.resolve(path);
        let metadata = match fs::symlink_metadata(&resolved) {
            Ok(metadata) => metadata,
            Err(err) => {
                debug!("Cannot stat {}: {err}", resolved.display());
                return None;
            }
        };

        // Links are not followed, a link back to an ancestor would never end.
        let kind = if metadata.file_type().is_symlink() {
            debug!("Skipping symbolic link {}", resolved.display());
            return None;
        } else if metadata.is_dir() {
            EntryKind::Directory
        } else if metadata.is_file() {
            EntryKind::File
        } else {
            return None;
        };

        let modified = metadata
            .modified()
            .map(|time| time.to_unix_millis())
            .unwrap_or_default();

        Some(EntryStat {
            kind,
            length: if kind == EntryKind::File { metadata.len() } else { 0 },
            modified,
        })
    }

    fn read_bytes(&self, path: &str) -> Option<Vec<u8>> {
        let resolved = self.resolve(path);
        fs::read(&resolved)
            .inspect_err(|err| debug!("Cannot read {}: {err}", resolved.display()))
            .ok()
    }

    fn set_modified(&self, path: &str, modified: i64) -> bool {
        let resolved = self.resolve(path);
        let time = FileTime::from_system_time(system_time_from_unix_millis(modified));
        match filetime::set_file_mtime(&resolved, time) {
            Ok(()) => true,
            Err(err) => {
                warn!("Failed to set modified time of {}: {err}", resolved.display());
                false
            }
        }
    }
}

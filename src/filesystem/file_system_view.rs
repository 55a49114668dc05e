use derive_more::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EntryKind {
    #[display("file")]
    File,
    #[display("directory")]
    Directory,
}

/// Metadata of a live filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryStat {
    pub kind: EntryKind,
    pub length: u64,
    /// Milliseconds since the Unix epoch.
    pub modified: i64,
}

impl EntryStat {
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Read access to a directory tree, addressed by `/`-separated paths relative
/// to a base directory. The empty path is the base directory itself.
///
/// Implementations never fail loudly: an entry that vanished or cannot be
/// read is reported as absent (`None`, an empty listing, or `false`).
pub trait FileSystemView: Send + Sync {
    /// Child names of a directory, in listing order.
    fn list(&self, directory: &str) -> Vec<String>;

    fn stat(&self, path: &str) -> Option<EntryStat>;

    fn read_bytes(&self, path: &str) -> Option<Vec<u8>>;

    /// Sets the modified-time of a file. Returns whether it took effect.
    fn set_modified(&self, path: &str, modified: i64) -> bool;
}

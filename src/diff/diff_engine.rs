use tracing::{debug, warn};

use crate::diff::Difference;
use crate::ext::join_relative;
use crate::filesystem::{EntryKind, EntryStat, FileSystemView};
use crate::hashing::{HashAlgorithm, HashCache};
use crate::snapshot::{VirtualNode, VirtualTree};

/// Compares a trusted snapshot with the live directory behind a
/// [`FileSystemView`].
///
/// Work is proportional to what changed: unchanged files are recognised by
/// their modified-time alone and only files whose timestamp moved get hashed.
pub struct DiffEngine<'a> {
    fs: &'a dyn FileSystemView,
    hashes: &'a mut HashCache,
    algorithm: HashAlgorithm,
    restamp: bool,
    difference: Difference,
}

impl<'a> DiffEngine<'a> {
    pub fn new(fs: &'a dyn FileSystemView, hashes: &'a mut HashCache, algorithm: HashAlgorithm) -> Self {
        Self {
            fs,
            hashes,
            algorithm,
            restamp: true,
            difference: Difference::default(),
        }
    }

    /// Whether a file whose hash still matches the snapshot gets its live
    /// modified-time set back to the stored one. On by default.
    pub fn with_restamp(mut self, restamp: bool) -> Self {
        self.restamp = restamp;
        self
    }

    pub fn compare(mut self, current: &VirtualTree) -> Difference {
        self.compare_level(current.children(), "");
        debug!(
            "Diff finished: {} old folders, {} old files, {} new folders, {} new files",
            self.difference.old_folders.len(),
            self.difference.old_files.len(),
            self.difference.new_folders.len(),
            self.difference.new_files.len()
        );
        self.difference
    }

    /// Live entries of one directory. Entries that cannot be stat'ed are
    /// treated as absent.
    fn read_level(&self, directory: &str) -> Vec<(String, EntryStat)> {
        self.fs
            .list(directory)
            .into_iter()
            .filter_map(|name| {
                let stat = self.fs.stat(&join_relative(directory, &name))?;
                Some((name, stat))
            })
            .collect()
    }

    fn compare_level(&mut self, current: &[VirtualNode], directory: &str) {
        let live = self.read_level(directory);

        // Additions and changes, driven by the live listing.
        for (name, stat) in &live {
            let path = join_relative(directory, name);
            let corresponding = current.iter().find(|node| node.name() == name);

            match (corresponding, stat.kind) {
                (None, _) => self.mark_live_as_new(&path, stat),
                (Some(VirtualNode::Directory { children, .. }), EntryKind::Directory) => {
                    self.compare_level(children, &path)
                }
                (Some(stored @ VirtualNode::File { .. }), EntryKind::File) => {
                    self.compare_file(stored, &path, stat)
                }
                (Some(stored), _) => {
                    debug!("{path} changed type, now a {}", stat.kind);
                    self.mark_as_old(stored, directory);
                    self.mark_live_as_new(&path, stat);
                }
            }
        }

        // Deletions, driven by the snapshot. Directory pairs were handled above.
        for stored in current {
            if !live.iter().any(|(name, _)| name == stored.name()) {
                self.mark_as_old(stored, directory);
            }
        }
    }

    fn compare_file(&mut self, stored: &VirtualNode, path: &str, stat: &EntryStat) {
        let VirtualNode::File { hash, modified, .. } = stored else {
            return;
        };

        if *modified == stat.modified {
            return;
        }

        match self.hashes.get_hash(path, self.algorithm) {
            Some(live_hash) if live_hash == *hash => {
                debug!("{path} has a new modified time but identical content");
                if self.restamp {
                    self.fs.set_modified(path, *modified);
                }
            }
            Some(_) => {
                self.difference.old_files.push(path.to_string());
                self.difference.new_files.push(path.to_string());
            }
            None => {
                warn!("{path} could not be read, treating it as removed");
                self.difference.old_files.push(path.to_string());
            }
        }
    }

    fn mark_as_old(&mut self, stored: &VirtualNode, directory: &str) {
        let path = join_relative(directory, stored.name());
        match stored {
            VirtualNode::Directory { children, .. } => {
                for child in children {
                    self.mark_as_old(child, &path);
                }
                self.difference.old_folders.push(path);
            }
            VirtualNode::File { .. } => self.difference.old_files.push(path),
        }
    }

    fn mark_live_as_new(&mut self, path: &str, stat: &EntryStat) {
        match stat.kind {
            EntryKind::Directory => {
                self.difference.new_folders.push(path.to_string());
                for (name, child) in self.read_level(path) {
                    self.mark_live_as_new(&join_relative(path, &name), &child);
                }
            }
            EntryKind::File => self.difference.new_files.push(path.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::filesystem::MemoryFileSystem;

    const H1: &[u8] = b"first";
    const H2: &[u8] = b"second";

    fn sha1(bytes: &[u8]) -> String {
        HashAlgorithm::Sha1.digest(bytes)
    }

    fn sorted(paths: &[String]) -> Vec<&str> {
        let mut paths: Vec<&str> = paths.iter().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    fn diff(current: &VirtualTree, fs: &Arc<MemoryFileSystem>) -> Difference {
        let mut hashes = HashCache::new(fs.clone());
        DiffEngine::new(&**fs, &mut hashes, HashAlgorithm::Sha1).compare(current)
    }

    fn scan(fs: &Arc<MemoryFileSystem>) -> VirtualTree {
        let mut hashes = HashCache::new(fs.clone());
        VirtualTree::from_file_system(&**fs, &mut hashes, HashAlgorithm::Sha1)
    }

    #[test]
    fn test_unchanged_directory_yields_empty_difference() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("a.txt", H1, 1)
                .with_file("dir/nested/b.txt", H2, 2)
                .with_dir("dir/empty"),
        );
        let current = scan(&fs);
        let reads_after_scan = fs.reads().len();

        let difference = diff(&current, &fs);

        assert!(!difference.has_differences());
        assert_eq!(fs.reads().len(), reads_after_scan);
    }

    #[test]
    fn test_removed_folder_and_new_file() {
        let current = VirtualTree::new(vec![
            VirtualNode::file("a.txt", 5, sha1(H1), 1),
            VirtualNode::directory("dir", vec![VirtualNode::file("b.txt", 6, sha1(H2), 2)]),
        ]);
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("a.txt", H1, 1)
                .with_file("c.txt", b"new", 3),
        );

        let difference = diff(&current, &fs);

        assert_eq!(sorted(&difference.old_files), vec!["dir/b.txt"]);
        assert_eq!(sorted(&difference.old_folders), vec!["dir"]);
        assert_eq!(sorted(&difference.new_files), vec!["c.txt"]);
        assert!(difference.new_folders.is_empty());
    }

    #[test]
    fn test_file_replaced_by_directory() {
        let current = VirtualTree::new(vec![VirtualNode::file("x", 5, sha1(H1), 1)]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("x/y.txt", H2, 2));

        let difference = diff(&current, &fs);

        assert_eq!(sorted(&difference.old_files), vec!["x"]);
        assert!(difference.old_folders.is_empty());
        assert_eq!(sorted(&difference.new_folders), vec!["x"]);
        assert_eq!(sorted(&difference.new_files), vec!["x/y.txt"]);
    }

    #[test]
    fn test_directory_replaced_by_file() {
        let current = VirtualTree::new(vec![VirtualNode::directory(
            "x",
            vec![
                VirtualNode::file("y.txt", 6, sha1(H2), 2),
                VirtualNode::directory("z", vec![VirtualNode::file("w.txt", 5, sha1(H1), 1)]),
            ],
        )]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("x", H1, 9));

        let difference = diff(&current, &fs);

        assert_eq!(sorted(&difference.old_files), vec!["x/y.txt", "x/z/w.txt"]);
        assert_eq!(sorted(&difference.old_folders), vec!["x", "x/z"]);
        assert_eq!(sorted(&difference.new_files), vec!["x"]);
        assert!(difference.new_folders.is_empty());
    }

    #[test]
    fn test_removed_directory_lists_every_nested_file_once() {
        let current = VirtualTree::new(vec![VirtualNode::directory(
            "gone",
            vec![
                VirtualNode::file("1.txt", 1, "h", 1),
                VirtualNode::directory(
                    "deep",
                    vec![
                        VirtualNode::file("2.txt", 1, "h", 1),
                        VirtualNode::directory("deeper", vec![VirtualNode::file("3.txt", 1, "h", 1)]),
                    ],
                ),
            ],
        )]);
        let fs = Arc::new(MemoryFileSystem::new());

        let difference = diff(&current, &fs);

        assert_eq!(
            sorted(&difference.old_files),
            vec!["gone/1.txt", "gone/deep/2.txt", "gone/deep/deeper/3.txt"]
        );
        assert_eq!(
            sorted(&difference.old_folders),
            vec!["gone", "gone/deep", "gone/deep/deeper"]
        );
        assert!(difference.new_files.is_empty() && difference.new_folders.is_empty());
    }

    #[test]
    fn test_new_directory_lists_every_nested_entry() {
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("pack/a.txt", H1, 1)
                .with_file("pack/inner/b.txt", H2, 2)
                .with_dir("pack/inner/void"),
        );

        let difference = diff(&VirtualTree::default(), &fs);

        assert_eq!(
            sorted(&difference.new_folders),
            vec!["pack", "pack/inner", "pack/inner/void"]
        );
        assert_eq!(sorted(&difference.new_files), vec!["pack/a.txt", "pack/inner/b.txt"]);
        assert!(fs.reads().is_empty());
    }

    #[test]
    fn test_equal_modified_time_skips_hashing_even_if_content_differs() {
        let current = VirtualTree::new(vec![VirtualNode::file("a.txt", 5, sha1(H1), 42)]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("a.txt", b"tampered", 42));

        let difference = diff(&current, &fs);

        assert!(!difference.has_differences());
        assert!(fs.reads().is_empty());
    }

    #[test]
    fn test_changed_content_marks_file_old_and_new() {
        let current = VirtualTree::new(vec![VirtualNode::file("a.txt", 5, sha1(H1), 1)]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("a.txt", H2, 2));

        let difference = diff(&current, &fs);

        assert_eq!(sorted(&difference.old_files), vec!["a.txt"]);
        assert_eq!(sorted(&difference.new_files), vec!["a.txt"]);
        assert!(fs.restamps().is_empty());
    }

    #[test]
    fn test_matching_hash_restamps_live_file() {
        let current = VirtualTree::new(vec![VirtualNode::file("a.txt", 5, sha1(H1), 100)]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("a.txt", H1, 999));

        let difference = diff(&current, &fs);

        assert!(!difference.has_differences());
        assert_eq!(fs.restamps(), vec![("a.txt".to_string(), 100)]);
        assert_eq!(fs.stat("a.txt").map(|stat| stat.modified), Some(100));
    }

    #[test]
    fn test_restamp_can_be_disabled() {
        let current = VirtualTree::new(vec![VirtualNode::file("a.txt", 5, sha1(H1), 100)]);
        let fs = Arc::new(MemoryFileSystem::new().with_file("a.txt", H1, 999));
        let mut hashes = HashCache::new(fs.clone());

        let difference = DiffEngine::new(&*fs, &mut hashes, HashAlgorithm::Sha1)
            .with_restamp(false)
            .compare(&current);

        assert!(!difference.has_differences());
        assert!(fs.restamps().is_empty());
        assert_eq!(fs.stat("a.txt").map(|stat| stat.modified), Some(999));
    }

    #[test]
    fn test_unreadable_changed_file_is_treated_as_removed() {
        let current = VirtualTree::new(vec![
            VirtualNode::file("locked.txt", 5, sha1(H1), 1),
            VirtualNode::file("ok.txt", 5, sha1(H1), 1),
        ]);
        let fs = Arc::new(
            MemoryFileSystem::new()
                .with_file("locked.txt", H1, 2)
                .with_file("ok.txt", H1, 1),
        );
        fs.deny_reads("locked.txt");

        let difference = diff(&current, &fs);

        assert_eq!(sorted(&difference.old_files), vec!["locked.txt"]);
        assert!(difference.new_files.is_empty());
    }

    #[test]
    fn test_metro64_snapshots_compare_with_metro64() {
        let fs = Arc::new(MemoryFileSystem::new().with_file("a.txt", H1, 7));
        let current = VirtualTree::new(vec![VirtualNode::file(
            "a.txt",
            5,
            HashAlgorithm::Metro64.digest(H1),
            1,
        )]);
        let mut hashes = HashCache::new(fs.clone());

        let difference =
            DiffEngine::new(&*fs, &mut hashes, HashAlgorithm::Metro64).compare(&current);

        assert!(!difference.has_differences());
    }
}

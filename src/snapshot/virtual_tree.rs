use std::collections::HashSet;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use snafu::{OptionExt, Snafu, ensure};
use tracing::debug;

use crate::ext::{RelativePathExt, join_relative};
use crate::filesystem::FileSystemView;
use crate::hashing::{HashAlgorithm, HashCache};
use crate::snapshot::VirtualNode;

/// Root of a snapshot: an unnamed directory owning its top-level entries.
///
/// Serializes as the plain array of top-level records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(transparent)]
pub struct VirtualTree {
    children: Vec<VirtualNode>,
}

impl VirtualTree {
    pub fn new(children: Vec<VirtualNode>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[VirtualNode] {
        &self.children
    }

    pub fn file_count(&self) -> usize {
        self.children.iter().map(VirtualNode::file_count).sum()
    }

    /// Scans the whole directory behind `fs`, hashing every file.
    ///
    /// Entries that disappear or become unreadable during the scan are left
    /// out rather than failing the scan.
    pub fn from_file_system(
        fs: &dyn FileSystemView,
        hashes: &mut HashCache,
        algorithm: HashAlgorithm,
    ) -> Self {
        Self {
            children: scan_directory(fs, hashes, algorithm, ""),
        }
    }

    pub fn get_node(&self, relative_path: &str) -> Result<&VirtualNode, TreeError> {
        let segments = relative_path.path_segments();
        let (leaf, parents) = segments.split_last().context(EmptyPathSnafu)?;

        let mut children = self.children.as_slice();
        for (depth, segment) in parents.iter().enumerate() {
            children = match find_child(children, segment) {
                Some(VirtualNode::Directory { children, .. }) => children.as_slice(),
                Some(VirtualNode::File { .. }) => {
                    return NotADirectorySnafu {
                        path: segments[..=depth].join("/"),
                    }
                    .fail();
                }
                None => return NotFoundSnafu { path: relative_path }.fail(),
            };
        }

        find_child(children, leaf).context(NotFoundSnafu { path: relative_path })
    }

    /// Removes the node at `relative_path` (with its whole subtree) and
    /// returns it.
    pub fn remove_node(&mut self, relative_path: &str) -> Result<VirtualNode, TreeError> {
        let (parent, leaf) = relative_path.split_parent();
        ensure!(!leaf.is_empty(), EmptyPathSnafu);

        let siblings = self.children_mut(parent)?;
        let index = siblings
            .iter()
            .position(|node| node.name() == leaf)
            .context(NotFoundSnafu { path: relative_path })?;
        Ok(siblings.remove(index))
    }

    /// Appends `node` to the directory at `parent_path`; the empty path is the
    /// root.
    pub fn insert(&mut self, parent_path: &str, node: VirtualNode) -> Result<(), TreeError> {
        let siblings = self.children_mut(parent_path)?;
        ensure!(
            find_child(siblings, node.name()).is_none(),
            AlreadyExistsSnafu {
                path: join_relative(parent_path, node.name()),
            }
        );
        siblings.push(node);
        Ok(())
    }

    /// Checks that no directory holds two children with the same name.
    pub fn validate(&self) -> Result<(), TreeError> {
        validate_children(&self.children, "")
    }

    fn children_mut(&mut self, directory: &str) -> Result<&mut Vec<VirtualNode>, TreeError> {
        let segments = directory.path_segments();
        let mut children = &mut self.children;

        for (depth, segment) in segments.iter().enumerate() {
            let node = children
                .iter_mut()
                .find(|node| node.name() == *segment)
                .context(NotFoundSnafu { path: directory })?;
            children = match node {
                VirtualNode::Directory { children, .. } => children,
                VirtualNode::File { .. } => {
                    return NotADirectorySnafu {
                        path: segments[..=depth].join("/"),
                    }
                    .fail();
                }
            };
        }

        Ok(children)
    }
}

fn find_child<'a>(children: &'a [VirtualNode], name: &str) -> Option<&'a VirtualNode> {
    children.iter().find(|node| node.name() == name)
}

fn validate_children(children: &[VirtualNode], directory: &str) -> Result<(), TreeError> {
    let mut seen = HashSet::with_capacity(children.len());
    for node in children {
        let path = join_relative(directory, node.name());
        ensure!(
            !node.name().is_empty() && seen.insert(node.name()),
            AlreadyExistsSnafu { path }
        );
        if let VirtualNode::Directory { children, .. } = node {
            validate_children(children, &path)?;
        }
    }
    Ok(())
}

fn scan_directory(
    fs: &dyn FileSystemView,
    hashes: &mut HashCache,
    algorithm: HashAlgorithm,
    directory: &str,
) -> Vec<VirtualNode> {
    fs.list(directory)
        .into_iter()
        .filter_map(|name| {
            let path = join_relative(directory, &name);
            let Some(stat) = fs.stat(&path) else {
                debug!("{path} vanished during scan");
                return None;
            };

            if stat.is_directory() {
                let children = scan_directory(fs, hashes, algorithm, &path);
                Some(VirtualNode::directory(name, children))
            } else {
                let Some(hash) = hashes.get_hash(&path, algorithm) else {
                    debug!("{path} became unreadable during scan");
                    return None;
                };
                Some(VirtualNode::file(name, stat.length, hash, stat.modified))
            }
        })
        .collect()
}

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum TreeError {
    #[snafu(display("'{path}' is a file, not a directory"))]
    NotADirectory { path: String },
    #[snafu(display("'{path}' does not exist in the snapshot"))]
    NotFound { path: String },
    #[snafu(display("'{path}' already exists in the snapshot"))]
    AlreadyExists { path: String },
    #[snafu(display("An empty path does not name a snapshot entry"))]
    EmptyPath,
}

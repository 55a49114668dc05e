use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

/// One entry of a snapshot.
///
/// Records are distinguished by shape: a directory carries `children`, a
/// file carries `length`, `hash` and `modified`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
#[serde(untagged)]
pub enum VirtualNode {
    Directory {
        name: String,
        children: Vec<VirtualNode>,
    },
    File {
        name: String,
        length: u64,
        hash: String,
        /// Milliseconds since the Unix epoch.
        modified: i64,
    },
}

impl VirtualNode {
    pub fn file(name: impl Into<String>, length: u64, hash: impl Into<String>, modified: i64) -> Self {
        VirtualNode::File {
            name: name.into(),
            length,
            hash: hash.into(),
            modified,
        }
    }

    pub fn directory(name: impl Into<String>, children: Vec<VirtualNode>) -> Self {
        VirtualNode::Directory {
            name: name.into(),
            children,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            VirtualNode::Directory { name, .. } | VirtualNode::File { name, .. } => name,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, VirtualNode::Directory { .. })
    }

    pub fn children(&self) -> Option<&[VirtualNode]> {
        match self {
            VirtualNode::Directory { children, .. } => Some(children),
            VirtualNode::File { .. } => None,
        }
    }

    /// Number of files at any depth below (and including) this node.
    pub fn file_count(&self) -> usize {
        match self {
            VirtualNode::File { .. } => 1,
            VirtualNode::Directory { children, .. } => {
                children.iter().map(VirtualNode::file_count).sum()
            }
        }
    }
}

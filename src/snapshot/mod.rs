//! In-memory snapshot of a directory tree and its encodings.

pub mod codec;
mod virtual_node;
mod virtual_tree;

pub use codec::{CodecError, PersistedSnapshot};
pub use virtual_node::VirtualNode;
pub use virtual_tree::{TreeError, VirtualTree};

//! Access to the live directory that snapshots are taken of.
//!
//! Everything above this module talks to the filesystem through
//! [`FileSystemView`], which reports vanished or unreadable entries as absent
//! instead of failing.

mod file_system_view;
#[cfg(test)]
mod memory_file_system;
mod real_file_system;

pub use file_system_view::{EntryKind, EntryStat, FileSystemView};
#[cfg(test)]
pub use memory_file_system::MemoryFileSystem;
pub use real_file_system::RealFileSystem;

/// Paths added and removed between a snapshot and the live directory.
///
/// Files are always listed individually, even inside a removed or added
/// folder. Order follows traversal order and carries no meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Difference {
    pub old_folders: Vec<String>,
    pub old_files: Vec<String>,
    pub new_folders: Vec<String>,
    pub new_files: Vec<String>,
}

impl Difference {
    pub fn has_differences(&self) -> bool {
        self.total() > 0
    }

    pub fn total(&self) -> usize {
        self.old_folders.len() + self.old_files.len() + self.new_folders.len() + self.new_files.len()
    }
}

/// Helpers for the `/`-separated relative paths used throughout snapshots and
/// differences. A backslash is accepted as a separator on input.
pub trait RelativePathExt {
    /// Non-empty path segments, in order.
    fn path_segments(&self) -> Vec<&str>;

    /// Splits into `(parent, leaf)`. The parent of a top-level entry is `""`.
    fn split_parent(&self) -> (&str, &str);

    fn path_depth(&self) -> usize;
}

impl RelativePathExt for str {
    fn path_segments(&self) -> Vec<&str> {
        self.split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect()
    }

    fn split_parent(&self) -> (&str, &str) {
        let trimmed = self.trim_end_matches(['/', '\\']);
        match trimmed.rfind(['/', '\\']) {
            Some(index) => (&trimmed[..index], &trimmed[index + 1..]),
            None => ("", trimmed),
        }
    }

    fn path_depth(&self) -> usize {
        self.path_segments().len()
    }
}

/// Joins a directory path and a child name, never producing a leading `/`
/// or `./`.
pub fn join_relative(directory: &str, name: &str) -> String {
    let directory = directory.strip_prefix("./").unwrap_or(directory);
    if directory.is_empty() || directory == "." {
        name.to_string()
    } else {
        format!("{directory}/{name}")
    }
}

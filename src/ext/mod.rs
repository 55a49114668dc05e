mod relative_path_ext;
mod system_time_ext;

pub use relative_path_ext::{RelativePathExt, join_relative};
pub use system_time_ext::{SystemTimeExt, system_time_from_unix_millis};

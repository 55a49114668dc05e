mod diff_engine;
mod difference;

pub use diff_engine::DiffEngine;
pub use difference::Difference;

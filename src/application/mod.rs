mod application;
mod console;
pub mod data;
mod regenerator;
mod runtime_config;

pub use application::{Application, ApplicationError};
pub use regenerator::{RegenerationError, Regenerator};
pub use runtime_config::RuntimeConfig;

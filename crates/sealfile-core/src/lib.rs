pub mod config;
pub mod error;
pub mod paths;

pub use error::{ErrorKind, SealError, SealResult};

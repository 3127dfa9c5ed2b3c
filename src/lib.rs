pub mod chunk;
pub mod completion;
pub mod config;
pub mod error;
pub mod merge;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod segment;
pub mod transcript;

pub use error::{DigestError, Result};

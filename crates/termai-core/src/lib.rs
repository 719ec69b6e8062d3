pub mod config;
pub mod error;
pub mod text;

pub use config::TermaiConfig;
pub use error::{Result, TermaiError};

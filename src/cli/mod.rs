pub mod commands;
pub mod fetch;
pub mod progress;

pub use commands::{Cli, Commands};

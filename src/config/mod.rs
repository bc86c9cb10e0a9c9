pub mod credentials;
pub mod parser;
pub mod types;

pub use types::*;
pub use parser::{load_file_config, parse_config, resolve_config, validate_config};

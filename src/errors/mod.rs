pub mod types;

pub use types::{IqFetchError, PersistStep};

pub mod iq;
pub mod row;

pub use iq::*;
pub use row::FlatRow;

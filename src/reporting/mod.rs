pub mod csv_writer;
pub mod flatten;

pub use csv_writer::{write_report, REPORT_HEADERS};
pub use flatten::flatten_report;

pub mod source;
pub mod iq_server;

pub use source::ReportSource;
pub use iq_server::IqServerClient;

pub mod events;
pub mod gate;
pub mod orchestrator;

pub use events::ReportEvent;
pub use gate::AdmissionGate;
pub use orchestrator::{parse_report_id, ReportOrchestrator, MAX_CONCURRENT_FETCHES};

use std::path::PathBuf;

/// Progress messages sent from the orchestrator to a display.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEvent {
    /// Applications were listed and fan-out is about to start
    ApplicationsListed {
        count: usize,
    },
    /// An application's report was fetched and flattened
    ApplicationCompleted {
        public_id: String,
        rows: usize,
    },
    /// An application has no usable latest report
    ApplicationSkipped {
        public_id: String,
    },
    /// The CSV file is in place
    ReportWritten {
        path: PathBuf,
        rows: usize,
    },
    ReportFailed {
        error: String,
    },
}

use std::fmt;
use thiserror::Error;

/// File-system step of the durable CSV write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStep {
    CreateDir,
    CreateTemp,
    WriteHeader,
    WriteRow(usize),
    Flush,
    Sync,
    Rename,
    Permissions,
}

impl fmt::Display for PersistStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistStep::CreateDir => write!(f, "prepare output dir"),
            PersistStep::CreateTemp => write!(f, "create temp file"),
            PersistStep::WriteHeader => write!(f, "write header"),
            PersistStep::WriteRow(n) => write!(f, "write row {}", n),
            PersistStep::Flush => write!(f, "flush csv"),
            PersistStep::Sync => write!(f, "fsync temp"),
            PersistStep::Rename => write!(f, "atomic rename"),
            PersistStep::Permissions => write!(f, "chmod"),
        }
    }
}

#[derive(Debug, Error)]
pub enum IqFetchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {endpoint}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No applications found{}", .filter.as_deref().map(|f| format!(" for organization {}", f)).unwrap_or_default())]
    NoApplications { filter: Option<String> },

    #[error("Cannot parse report id from {0:?}")]
    ReportLocator(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Application {public_id}: {source}")]
    Application {
        public_id: String,
        #[source]
        source: Box<IqFetchError>,
    },

    #[error("{step} failed: {source}")]
    Persist {
        step: PersistStep,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IqFetchError {
    /// Wrap a per-application failure with the application's public id.
    pub fn for_application(self, public_id: &str) -> Self {
        IqFetchError::Application {
            public_id: public_id.to_string(),
            source: Box::new(self),
        }
    }

    pub fn persist(step: PersistStep, source: std::io::Error) -> Self {
        IqFetchError::Persist { step, source }
    }

    /// The underlying error, looking through application wrappers.
    pub fn root(&self) -> &IqFetchError {
        match self {
            IqFetchError::Application { source, .. } => source.root(),
            other => other,
        }
    }
}

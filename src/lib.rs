pub mod cli;
pub mod client;
pub mod config;
pub mod errors;
pub mod models;
pub mod pipeline;
pub mod reporting;

pub use client::{IqServerClient, ReportSource};
pub use errors::IqFetchError;
pub use pipeline::ReportOrchestrator;

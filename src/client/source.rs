use async_trait::async_trait;
use crate::errors::IqFetchError;
use crate::models::{Application, Organization, PolicyViolationReport, ReportInfo};

/// Remote service the report pipeline reads from.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// All applications, or only those of one organization
    async fn list_applications(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<Application>, IqFetchError>;

    async fn list_organizations(&self) -> Result<Vec<Organization>, IqFetchError>;

    /// Most recent report of an application (by internal id); `None` when
    /// the application was never evaluated.
    async fn latest_report(
        &self,
        application_id: &str,
    ) -> Result<Option<ReportInfo>, IqFetchError>;

    async fn policy_violations(
        &self,
        public_id: &str,
        report_id: &str,
        organization_name: &str,
    ) -> Result<PolicyViolationReport, IqFetchError>;

    /// Source name for logging
    fn source_name(&self) -> &str;
}

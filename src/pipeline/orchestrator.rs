use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;
use crate::client::ReportSource;
use crate::config::{AppConfig, MergeOrder, DEFAULT_TIMEOUT_SECS};
use crate::errors::IqFetchError;
use crate::models::{Application, FlatRow};
use crate::reporting::{flatten_report, write_report};
use super::events::ReportEvent;
use super::gate::AdmissionGate;
use tracing::{debug, error, info, info_span, warn};

/// Upper bound on applications fetched at the same time.
pub const MAX_CONCURRENT_FETCHES: usize = 10;

/// Path segment preceding the report id in a report's HTML URL.
pub const REPORT_PATH_MARKER: &str = "/report/";

/// Fetches the latest policy report of every application and writes them
/// as one CSV file.
pub struct ReportOrchestrator {
    source: Arc<dyn ReportSource>,
    output_dir: PathBuf,
    timeout: Duration,
    merge_order: MergeOrder,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ReportEvent>>,
}

/// One application's contribution, consumed once by the merge step.
struct AppOutcome {
    index: usize,
    result: Result<Vec<FlatRow>, IqFetchError>,
}

/// Read-only state shared by the per-application tasks.
struct FetchContext {
    source: Arc<dyn ReportSource>,
    org_names: HashMap<String, String>,
    deadline: Instant,
    cancel_token: CancellationToken,
    event_tx: Option<mpsc::UnboundedSender<ReportEvent>>,
}

impl FetchContext {
    fn emit(&self, event: ReportEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    fn organization_name<'a>(&'a self, organization_id: &'a str) -> &'a str {
        match self.org_names.get(organization_id) {
            Some(name) => name,
            None => {
                warn!(org_id = organization_id, "Organization name not found, using ID as fallback");
                organization_id
            }
        }
    }

    /// Only checked before a task starts its network calls.
    fn check_cancelled(&self) -> Result<(), IqFetchError> {
        if self.cancel_token.is_cancelled() {
            return Err(IqFetchError::Cancelled("report generation was cancelled".into()));
        }
        if Instant::now() >= self.deadline {
            return Err(IqFetchError::Cancelled("deadline elapsed before fetch started".into()));
        }
        Ok(())
    }
}

impl ReportOrchestrator {
    pub fn new(source: Arc<dyn ReportSource>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            output_dir: output_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            merge_order: MergeOrder::default(),
            cancel_token: CancellationToken::new(),
            event_tx: None,
        }
    }

    pub fn from_config(source: Arc<dyn ReportSource>, config: &AppConfig) -> Self {
        Self::new(source, config.output_dir.clone())
            .with_timeout(config.timeout)
            .with_merge_order(config.merge_order)
    }

    /// Upper bound for the whole run, measured from the start of
    /// `generate_latest_policy_report`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_merge_order(mut self, merge_order: MergeOrder) -> Self {
        self.merge_order = merge_order;
        self
    }

    /// Replace the orchestrator's cancel token with an external one (e.g. wired to Ctrl-C).
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel_token = token;
        self
    }

    /// Attach an event channel for streaming progress to a display.
    pub fn with_event_channel(mut self, tx: mpsc::UnboundedSender<ReportEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    fn emit(&self, event: ReportEvent) {
        if let Some(ref tx) = self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Fetch the latest policy violations of all applications (optionally of
    /// one organization only) and write them to `<output_dir>/<file_name>`.
    ///
    /// Returns the absolute path of the written file. The first failure of any
    /// application aborts the run and nothing is written.
    pub async fn generate_latest_policy_report(
        &self,
        organization_id: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf, IqFetchError> {
        let result = self.run(organization_id, file_name).await;
        if let Err(ref e) = result {
            self.emit(ReportEvent::ReportFailed { error: e.to_string() });
        }
        result
    }

    async fn run(
        &self,
        organization_id: Option<&str>,
        file_name: &str,
    ) -> Result<PathBuf, IqFetchError> {
        let deadline = Instant::now().checked_add(self.timeout).ok_or_else(|| {
            IqFetchError::Config(format!("timeout of {}s is out of range", self.timeout.as_secs()))
        })?;
        let organization_id = organization_id.filter(|id| !id.is_empty());
        info!(
            org_id = organization_id.unwrap_or("all"),
            file_name,
            source = self.source.source_name(),
            "Generating latest policy report"
        );

        let applications = self.source.list_applications(organization_id).await.map_err(|e| {
            error!(org_id = organization_id.unwrap_or("all"), error = %e, "Failed to retrieve application list");
            e
        })?;
        info!(count = applications.len(), "Fetched applications");

        if applications.is_empty() {
            warn!(org_id = organization_id.unwrap_or("all"), "No applications found matching criteria");
            return Err(IqFetchError::NoApplications {
                filter: organization_id.map(str::to_string),
            });
        }

        let organizations = self.source.list_organizations().await.map_err(|e| {
            error!(error = %e, "Failed to retrieve organization list");
            e
        })?;
        let org_names: HashMap<String, String> = organizations
            .into_iter()
            .map(|org| (org.id, org.name))
            .collect();
        info!(count = org_names.len(), "Built organization ID-to-name map");

        self.emit(ReportEvent::ApplicationsListed { count: applications.len() });

        let ctx = Arc::new(FetchContext {
            source: self.source.clone(),
            org_names,
            deadline,
            cancel_token: self.cancel_token.clone(),
            event_tx: self.event_tx.clone(),
        });
        let rows = self.collect_rows(applications, ctx).await?;

        let target = self.output_dir.join(file_name);
        let row_count = rows.len();
        info!(path = %target.display(), total_rows = row_count, "Writing CSV report");

        let write_target = target.clone();
        tokio::task::spawn_blocking(move || write_report(&write_target, &rows))
            .await
            .map_err(|e| IqFetchError::Internal(format!("CSV writer task failed: {}", e)))??;

        let path = absolute_path(&target)?;
        self.emit(ReportEvent::ReportWritten { path: path.clone(), rows: row_count });
        info!(path = %path.display(), rows = row_count, "Report written successfully");
        Ok(path)
    }

    /// Fan out one task per application behind the admission gate and merge
    /// their rows. Fails fast on the first error received.
    async fn collect_rows(
        &self,
        applications: Vec<Application>,
        ctx: Arc<FetchContext>,
    ) -> Result<Vec<FlatRow>, IqFetchError> {
        let total = applications.len();
        let gate = AdmissionGate::new(MAX_CONCURRENT_FETCHES);
        let (tx, mut rx) = mpsc::channel::<AppOutcome>(total);

        info!(apps_to_process = total, max_concurrent = gate.capacity(), "Starting concurrent report fetching");

        let handles: Vec<_> = applications
            .into_iter()
            .enumerate()
            .map(|(index, app)| {
                let gate = gate.clone();
                let ctx = ctx.clone();
                let tx = tx.clone();
                let span = info_span!("application", public_id = %app.public_id, internal_id = %app.id);

                tokio::spawn(
                    async move {
                        let result = match gate.acquire().await {
                            Ok(_permit) => fetch_application(&ctx, &app).await,
                            Err(e) => Err(e),
                        };
                        let result = result.map_err(|e| e.for_application(&app.public_id));
                        let _ = tx.send(AppOutcome { index, result }).await;
                    }
                    .instrument(span),
                )
            })
            .collect();

        // Channel closes once every task has sent and dropped its sender
        drop(tx);

        let mut contributions: Vec<(usize, Vec<FlatRow>)> = Vec::with_capacity(total);
        while let Some(outcome) = rx.recv().await {
            match outcome.result {
                Ok(rows) => contributions.push((outcome.index, rows)),
                Err(e) => {
                    error!(error = %e, "Application processing failed, aborting report");
                    for handle in &handles {
                        handle.abort();
                    }
                    return Err(e);
                }
            }
        }

        for joined in futures::future::join_all(handles).await {
            if let Err(e) = joined {
                return Err(IqFetchError::Internal(format!("Application task failed: {}", e)));
            }
        }
        if contributions.len() != total {
            return Err(IqFetchError::Internal(format!(
                "Expected {} application results, received {}",
                total,
                contributions.len()
            )));
        }

        if self.merge_order == MergeOrder::Application {
            contributions.sort_by_key(|(index, _)| *index);
        }
        debug!(merge_order = %self.merge_order, applications = total, "Merged application results");

        Ok(contributions.into_iter().flat_map(|(_, rows)| rows).collect())
    }
}

async fn fetch_application(
    ctx: &FetchContext,
    app: &Application,
) -> Result<Vec<FlatRow>, IqFetchError> {
    ctx.check_cancelled()?;

    let report_info = match ctx.source.latest_report(&app.id).await? {
        Some(info) if !info.report_html_url.trim().is_empty() => info,
        _ => {
            info!("No recent report found for application, skipping");
            ctx.emit(ReportEvent::ApplicationSkipped { public_id: app.public_id.clone() });
            return Ok(Vec::new());
        }
    };

    let report_id = parse_report_id(&report_info.report_html_url)?;
    debug!(report_id, stage = %report_info.stage, "Parsed report ID");

    let org_name = ctx.organization_name(&app.organization_id);
    let report = ctx.source.policy_violations(&app.public_id, report_id, org_name).await?;
    let rows = flatten_report(&report, &app.public_id, org_name);
    debug!(rows = rows.len(), "Fetched policy violations");

    ctx.emit(ReportEvent::ApplicationCompleted {
        public_id: app.public_id.clone(),
        rows: rows.len(),
    });
    Ok(rows)
}

/// Extract the report id: everything after the first `/report/` marker.
pub fn parse_report_id(report_html_url: &str) -> Result<&str, IqFetchError> {
    match report_html_url.split_once(REPORT_PATH_MARKER) {
        Some((_, id)) if !id.is_empty() => Ok(id),
        _ => Err(IqFetchError::ReportLocator(report_html_url.to_string())),
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf, IqFetchError> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

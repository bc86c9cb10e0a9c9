use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use crate::cli::commands::FetchArgs;
use crate::cli::progress::FetchProgress;
use crate::client::IqServerClient;
use crate::config::{self, AppConfig, FileConfig, MergeOrder};
use crate::errors::IqFetchError;
use crate::pipeline::ReportOrchestrator;
use tracing::{info, warn};

pub async fn handle_fetch(args: FetchArgs, quiet: bool) -> Result<(), IqFetchError> {
    let config = build_app_config(&args).await?;
    info!(
        server_url = %config.server_url,
        org_id = config.organization_id.as_deref().unwrap_or("all"),
        output_dir = %config.output_dir.display(),
        "Loaded configuration"
    );

    let client = IqServerClient::new(&config.server_url, &config.username, &config.password)?;

    let filename = args.filename.clone().unwrap_or_else(default_report_filename);
    info!(filename = %filename, "Report filename set");

    let cancel_token = CancellationToken::new();
    let interrupt = cancel_token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling report generation");
            interrupt.cancel();
        }
    });

    let mut orchestrator = ReportOrchestrator::from_config(Arc::new(client), &config)
        .with_cancel_token(cancel_token);

    let progress_task = if quiet {
        None
    } else {
        let (tx, mut rx) = mpsc::unbounded_channel();
        orchestrator = orchestrator.with_event_channel(tx);
        Some(tokio::spawn(async move {
            let mut progress = FetchProgress::new();
            while let Some(event) = rx.recv().await {
                progress.handle_event(&event);
            }
        }))
    };

    info!(org_id = config.organization_id.as_deref().unwrap_or("all"), "Starting report generation");
    let result = orchestrator
        .generate_latest_policy_report(config.organization_id.as_deref(), &filename)
        .await;

    // Closes the event channel so the progress task can finish
    drop(orchestrator);
    if let Some(task) = progress_task {
        let _ = task.await;
    }

    let path = result?;
    info!(path = %path.display(), "Report generation completed");
    println!("Wrote report: {}", path.display());
    Ok(())
}

/// File config, then environment, then command-line flags.
pub async fn build_app_config(args: &FetchArgs) -> Result<AppConfig, IqFetchError> {
    let file_config = config::load_file_config(args.config.as_deref().map(Path::new)).await?;
    merge_config(file_config.as_ref(), args, |key| std::env::var(key).ok())
}

/// Validation runs only once the flags are applied, so a flag can replace
/// an invalid file or environment value.
fn merge_config<F>(file: Option<&FileConfig>, args: &FetchArgs, env: F) -> Result<AppConfig, IqFetchError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut app_config = config::resolve_config(file, env)?;
    apply_overrides(&mut app_config, args);
    config::validate_config(&app_config)?;
    Ok(app_config)
}

fn apply_overrides(config: &mut AppConfig, args: &FetchArgs) {
    if let Some(org_id) = args.org_id.as_ref().filter(|id| !id.is_empty()) {
        config.organization_id = Some(org_id.clone());
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = PathBuf::from(dir);
    }
    if let Some(secs) = args.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if args.stable_order {
        config.merge_order = MergeOrder::Application;
    }
}

/// Local-time file name such as `2024-05-01_13-45-00.csv`.
pub fn default_report_filename() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S.csv").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig {
            server_url: "http://localhost:8070/api/v2".into(),
            username: "admin".into(),
            password: "admin123".into(),
            organization_id: Some("org-file".into()),
            output_dir: PathBuf::from("reports_output"),
            timeout: Duration::from_secs(30),
            merge_order: MergeOrder::Arrival,
        }
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = base_config();
        let args = FetchArgs {
            org_id: Some("org-cli".into()),
            output_dir: Some("/tmp/out".into()),
            timeout: Some(90),
            stable_order: true,
            ..Default::default()
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.organization_id.as_deref(), Some("org-cli"));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.timeout, Duration::from_secs(90));
        assert_eq!(config.merge_order, MergeOrder::Application);
    }

    #[test]
    fn test_absent_flags_keep_config() {
        let mut config = base_config();
        apply_overrides(&mut config, &FetchArgs { org_id: Some(String::new()), ..Default::default() });
        assert_eq!(config.organization_id.as_deref(), Some("org-file"));
        assert_eq!(config.output_dir, PathBuf::from("reports_output"));
        assert_eq!(config.merge_order, MergeOrder::Arrival);
    }

    fn server_env(key: &str) -> Option<String> {
        match key {
            "IQ_SERVER_URL" => Some("http://localhost:8070/api/v2".into()),
            "IQ_USERNAME" => Some("admin".into()),
            "IQ_PASSWORD" => Some("admin123".into()),
            _ => None,
        }
    }

    #[test]
    fn test_timeout_flag_replaces_invalid_file_value() {
        let file: FileConfig = serde_yaml::from_str("report:\n  timeout_secs: 0\n").unwrap();

        let err = merge_config(Some(&file), &FetchArgs::default(), server_env).unwrap_err();
        assert!(matches!(err, IqFetchError::Config(ref m) if m.contains("greater than zero")));

        let args = FetchArgs { timeout: Some(60), ..Default::default() };
        let config = merge_config(Some(&file), &args, server_env).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_oversized_timeout_flag_rejected() {
        let args = FetchArgs { timeout: Some(u64::MAX), ..Default::default() };
        let err = merge_config(None, &args, server_env).unwrap_err();
        assert!(matches!(err, IqFetchError::Config(ref m) if m.contains("at most")));
    }

    #[test]
    fn test_default_report_filename_shape() {
        let name = default_report_filename();
        assert!(name.ends_with(".csv"));
        // YYYY-MM-DD_HH-MM-SS.csv
        assert_eq!(name.len(), 23);
        assert_eq!(&name[10..11], "_");
    }
}

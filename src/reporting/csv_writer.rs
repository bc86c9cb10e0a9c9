use std::fs;
use std::path::Path;
use crate::errors::{IqFetchError, PersistStep};
use crate::models::FlatRow;
use tracing::{debug, error, info, warn};

pub const REPORT_HEADERS: [&str; 11] = [
    "No.",
    "Application",
    "Organization",
    "Policy",
    "Format",
    "Component",
    "Threat",
    "Policy/Action",
    "Constraint Name",
    "Condition",
    "CVE",
];

/// Permission bits of a written report: owner rw, group/other r.
pub const REPORT_FILE_MODE: u32 = 0o644;

/// Atomically write `rows` as CSV to `path`.
///
/// The rows go to a temp file in the destination directory which is synced
/// and then renamed over `path`. On failure the temp file is removed and
/// `path` keeps its previous content.
pub fn write_report(path: &Path, rows: &[FlatRow]) -> Result<(), IqFetchError> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    debug!(dir = %dir.display(), "Preparing output directory");
    fs::create_dir_all(dir).map_err(|e| {
        error!(dir = %dir.display(), error = %e, "Failed to create output dir");
        IqFetchError::persist(PersistStep::CreateDir, e)
    })?;

    // Removed on drop until persisted
    let tmp = tempfile::Builder::new()
        .prefix(".tmp-")
        .suffix(".csv")
        .tempfile_in(dir)
        .map_err(|e| {
            error!(dir = %dir.display(), error = %e, "Create temp file failed");
            IqFetchError::persist(PersistStep::CreateTemp, e)
        })?;
    debug!(tmp = %tmp.path().display(), "Created temp file");

    {
        let mut writer = csv::Writer::from_writer(tmp.as_file());

        writer.write_record(REPORT_HEADERS).map_err(|e| {
            error!(error = %e, "Write header failed");
            IqFetchError::persist(PersistStep::WriteHeader, e.into())
        })?;

        for (i, row) in rows.iter().enumerate() {
            let number = i + 1;
            writer.write_record(record(number, row)).map_err(|e| {
                error!(row = number, error = %e, "Write row failed");
                IqFetchError::persist(PersistStep::WriteRow(number), e.into())
            })?;
        }

        writer.flush().map_err(|e| {
            error!(error = %e, "CSV flush failed");
            IqFetchError::persist(PersistStep::Flush, e)
        })?;
    }

    // Mode is fixed before the rename so the destination never shows the
    // temp file's 0600.
    set_report_permissions(tmp.as_file()).map_err(|e| {
        warn!(tmp = %tmp.path().display(), error = %e, "chmod failed");
        IqFetchError::persist(PersistStep::Permissions, e)
    })?;

    tmp.as_file().sync_all().map_err(|e| {
        error!(tmp = %tmp.path().display(), error = %e, "fsync temp file failed");
        IqFetchError::persist(PersistStep::Sync, e)
    })?;

    // Dropping a File cannot report a close error. The sync_all above is the
    // last point where write-back failures surface, so it stands in for close.
    let (file, tmp_path) = tmp.into_parts();
    drop(file);

    // The temp path is still deleted on drop if the rename fails
    tmp_path.persist(path).map_err(|e| {
        error!(dest = %path.display(), error = %e.error, "Atomic rename failed");
        IqFetchError::persist(PersistStep::Rename, e.error)
    })?;

    sync_dir(dir);

    info!(path = %path.display(), rows = rows.len(), "CSV file written successfully");
    Ok(())
}

fn record(number: usize, row: &FlatRow) -> [String; 11] {
    [
        number.to_string(),
        row.application.clone(),
        row.organization.clone(),
        row.policy.clone(),
        row.format.clone(),
        row.component.clone(),
        row.threat.to_string(),
        row.policy_action.clone(),
        row.constraint_name.clone(),
        row.condition.clone(),
        row.cve.clone(),
    ]
}

/// Best-effort: persist the rename itself.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Ok(d) = fs::File::open(dir) {
        if let Err(e) = d.sync_all() {
            debug!(dir = %dir.display(), error = %e, "Directory fsync failed");
        }
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}

#[cfg(unix)]
fn set_report_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(REPORT_FILE_MODE))
}

#[cfg(not(unix))]
fn set_report_permissions(file: &fs::File) -> std::io::Result<()> {
    let mut perms = file.metadata()?.permissions();
    perms.set_readonly(false);
    file.set_permissions(perms)
}

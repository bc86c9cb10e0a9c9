/// One flattened (component, violation, constraint) triple of a report.
///
/// The sequential "No." column is not stored here; it is assigned when the
/// rows are written.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlatRow {
    pub application: String,
    pub organization: String,
    pub policy: String,
    pub format: String,
    pub component: String,
    pub threat: i64,
    pub policy_action: String,
    pub constraint_name: String,
    pub condition: String,
    /// Upstream reports carry no CVE for this view; always empty.
    pub cve: String,
}

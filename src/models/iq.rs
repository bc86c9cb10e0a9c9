use serde::Deserialize;

/// An application registered in IQ Server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Application {
    pub id: String,
    pub public_id: String,
    pub organization_id: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ApplicationsEnvelope {
    pub applications: Vec<Application>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(default)]
pub struct Organization {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct OrganizationsEnvelope {
    pub organizations: Vec<Organization>,
}

/// Metadata about one evaluation report of an application.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportInfo {
    pub stage: String,
    pub report_html_url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Condition {
    pub condition_summary: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Constraint {
    pub constraint_name: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Violation {
    pub policy_name: String,
    /// IQ Server sends numbers as JSON floats.
    pub policy_threat_level: f64,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ComponentIdentifier {
    pub format: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Component {
    pub display_name: String,
    pub component_identifier: ComponentIdentifier,
    pub violations: Vec<Violation>,
}

impl Component {
    pub fn format(&self) -> &str {
        &self.component_identifier.format
    }
}

/// Response of the `applications/{publicId}/reports/{reportId}/policy` endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct PolicyViolationReport {
    pub components: Vec<Component>,
}

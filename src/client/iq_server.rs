use std::time::Duration;
use async_trait::async_trait;
use reqwest::{header, Client, Url};
use serde::de::DeserializeOwned;
use crate::config::credentials::redact_credentials;
use crate::errors::IqFetchError;
use crate::models::{
    Application, ApplicationsEnvelope, Organization, OrganizationsEnvelope,
    PolicyViolationReport, ReportInfo,
};
use super::source::ReportSource;
use tracing::{debug, error, info};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// IQ Server REST API v2 client.
pub struct IqServerClient {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
}

impl IqServerClient {
    /// `server_url` is expected to already include `/api/v2`.
    pub fn new(server_url: &str, username: &str, password: &str) -> Result<Self, IqFetchError> {
        if server_url.trim().is_empty() {
            return Err(IqFetchError::Config("server URL is required".into()));
        }
        if username.is_empty() {
            return Err(IqFetchError::Config("username is required".into()));
        }
        if password.is_empty() {
            return Err(IqFetchError::Config("password is required".into()));
        }

        let base_url = normalize_base_url(server_url)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| IqFetchError::Config(format!("Failed to build HTTP client: {}", e)))?;

        info!(base_url = %base_url, "Initialized IQ Server API client");
        Ok(Self {
            client,
            base_url,
            username: username.to_string(),
            password: password.to_string(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, IqFetchError> {
        let url = self.base_url.join(endpoint)
            .map_err(|e| IqFetchError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))?;
        debug!(method = "GET", url = %url, "Executing request");

        let resp = self.client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .query(query)
            .send()
            .await
            .map_err(|e| IqFetchError::Network(format!("GET {} failed: {}", endpoint, e)))?;

        let status = resp.status();
        debug!(status = status.as_u16(), url = %url, "Request completed");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let body = redact_credentials(body.trim(), &[&self.password]);
            error!(endpoint, status = status.as_u16(), body = %body, "IQ Server request failed");
            return Err(IqFetchError::Http {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| IqFetchError::Decode(format!("{}: {}", endpoint, e)))
    }
}

/// Trim trailing slashes and re-add exactly one, so relative endpoints are
/// appended to the API path instead of replacing its last segment.
fn normalize_base_url(server_url: &str) -> Result<Url, IqFetchError> {
    let trimmed = server_url.trim().trim_end_matches('/');
    let mut url = Url::parse(trimmed)
        .map_err(|e| IqFetchError::Config(format!("Invalid server URL {:?}: {}", server_url, e)))?;
    if url.cannot_be_a_base() {
        return Err(IqFetchError::Config(format!("Invalid server URL {:?}", server_url)));
    }
    let path = format!("{}/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    Ok(url)
}

#[async_trait]
impl ReportSource for IqServerClient {
    async fn list_applications(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<Application>, IqFetchError> {
        let endpoint = match organization_id.filter(|id| !id.is_empty()) {
            Some(id) => format!("applications/organization/{}", id),
            None => "applications".to_string(),
        };
        debug!(org_id = organization_id.unwrap_or("all"), "Fetching applications");

        let env: ApplicationsEnvelope = self.get_json(&endpoint, &[]).await?;
        Ok(env.applications)
    }

    async fn list_organizations(&self) -> Result<Vec<Organization>, IqFetchError> {
        debug!("Fetching organizations");
        let env: OrganizationsEnvelope = self.get_json("organizations", &[]).await?;
        debug!(count = env.organizations.len(), "Retrieved organizations");
        Ok(env.organizations)
    }

    async fn latest_report(
        &self,
        application_id: &str,
    ) -> Result<Option<ReportInfo>, IqFetchError> {
        let endpoint = format!("reports/applications/{}", application_id);
        let reports: Vec<ReportInfo> = self.get_json(&endpoint, &[]).await?;

        if reports.is_empty() {
            debug!(app_id = application_id, "No reports found");
        } else {
            debug!(app_id = application_id, count = reports.len(), "Found reports");
        }
        Ok(reports.into_iter().next())
    }

    async fn policy_violations(
        &self,
        public_id: &str,
        report_id: &str,
        organization_name: &str,
    ) -> Result<PolicyViolationReport, IqFetchError> {
        debug!(public_id, report_id, organization = organization_name, "Fetching policy violations");
        let endpoint = format!("applications/{}/reports/{}/policy", public_id, report_id);
        self.get_json(&endpoint, &[("includeViolationTimes", "true")]).await
    }

    fn source_name(&self) -> &str {
        "iq-server"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url_adds_single_trailing_slash() {
        let url = normalize_base_url("https://iq.example.com/api/v2").unwrap();
        assert_eq!(url.as_str(), "https://iq.example.com/api/v2/");
        let url = normalize_base_url("https://iq.example.com/api/v2///").unwrap();
        assert_eq!(url.as_str(), "https://iq.example.com/api/v2/");
        assert_eq!(
            url.join("applications").unwrap().as_str(),
            "https://iq.example.com/api/v2/applications"
        );
    }

    #[test]
    fn test_normalize_base_url_rejects_garbage() {
        assert!(normalize_base_url("not a url").is_err());
        assert!(normalize_base_url("mailto:admin@example.com").is_err());
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            IqServerClient::new("  ", "u", "p"),
            Err(IqFetchError::Config(_))
        ));
        assert!(matches!(
            IqServerClient::new("http://localhost:8070/api/v2", "", "p"),
            Err(IqFetchError::Config(_))
        ));
        assert!(matches!(
            IqServerClient::new("http://localhost:8070/api/v2", "u", ""),
            Err(IqFetchError::Config(_))
        ));
    }

    #[test]
    fn test_new_normalizes_base_url() {
        let client = IqServerClient::new("http://localhost:8070/api/v2/", "admin", "admin123").unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:8070/api/v2/");
        assert_eq!(client.source_name(), "iq-server");
    }
}

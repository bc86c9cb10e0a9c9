#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use data_encoding::BASE64;
use serde_json::{json, Value};

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "admin123";

struct StubState {
    routes: HashMap<String, (StatusCode, Value)>,
    requests: Mutex<Vec<String>>,
}

/// IQ Server stand-in serving canned JSON under `/api/v2/`.
pub struct StubServer {
    pub addr: SocketAddr,
    state: Arc<StubState>,
}

impl StubServer {
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v2", self.addr)
    }

    /// Path and query of every request received, in order.
    pub fn requests(&self) -> Vec<String> {
        self.state.requests.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct StubBuilder {
    routes: HashMap<String, (StatusCode, Value)>,
}

impl StubBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn json(self, path: &str, body: Value) -> Self {
        self.status(path, StatusCode::OK, body)
    }

    pub fn status(mut self, path: &str, status: StatusCode, body: Value) -> Self {
        self.routes.insert(format!("/api/v2/{}", path), (status, body));
        self
    }

    pub async fn start(self) -> StubServer {
        let state = Arc::new(StubState {
            routes: self.routes,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move { axum::serve(listener, app).await.expect("serve stub") });

        StubServer { addr, state }
    }
}

async fn handle(State(state): State<Arc<StubState>>, uri: Uri, headers: HeaderMap) -> Response {
    state.requests.lock().unwrap().push(uri.to_string());

    let expected = format!("Basic {}", BASE64.encode(format!("{}:{}", USERNAME, PASSWORD).as_bytes()));
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |v| v == expected);
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }

    match state.routes.get(uri.path()) {
        Some((status, body)) => (*status, Json(body.clone())).into_response(),
        None => (StatusCode::NOT_FOUND, format!("no stub for {}", uri.path())).into_response(),
    }
}

pub fn applications(apps: &[(&str, &str, &str)]) -> Value {
    json!({
        "applications": apps
            .iter()
            .map(|(id, public_id, org)| json!({"id": id, "publicId": public_id, "organizationId": org}))
            .collect::<Vec<_>>()
    })
}

pub fn organizations(orgs: &[(&str, &str)]) -> Value {
    json!({
        "organizations": orgs
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect::<Vec<_>>()
    })
}

pub fn latest_report(report_id: &str) -> Value {
    json!([
        {
            "stage": "build",
            "reportHtmlUrl": format!("https://iq.example.com/ui/links/application/app/report/{}", report_id)
        },
        {
            "stage": "release",
            "reportHtmlUrl": "https://iq.example.com/ui/links/application/app/report/older"
        }
    ])
}

/// One component with one violation and one constraint of two conditions.
pub fn policy_report(component: &str, format: &str, policy: &str, threat: f64) -> Value {
    json!({
        "components": [
            {
                "displayName": component,
                "componentIdentifier": { "format": format },
                "violations": [
                    {
                        "policyName": policy,
                        "policyThreatLevel": threat,
                        "constraints": [
                            {
                                "constraintName": "Medium risk CVSS score",
                                "conditions": [
                                    { "conditionSummary": "Security Vulnerability Severity >= 4" },
                                    { "conditionSummary": "Security Vulnerability Severity < 7" }
                                ]
                            }
                        ]
                    }
                ]
            }
        ]
    })
}

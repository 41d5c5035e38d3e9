//! Shared fixtures: an in-memory Web API that records every call.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use webpub_core::{Binding, BindingKind, Environment, EnvironmentName, PackageName};
use webpub_remote::{
    AccessToken, ApiRequest, ApiResponse, AuthContext, Connector, Method, RemoteError, Transport,
};
use webpub_sync::{FileOutcome, PublishStep, Publisher, Reporter};

pub const PACKAGE_ID: &str = "11111111-2222-3333-4444-555555555555";

/// One observed request with its wall-clock span.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub path: String,
    pub started: Instant,
    pub finished: Instant,
}

impl Call {
    pub fn overlaps(&self, other: &Call) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

#[derive(Default)]
struct Server {
    /// Resource name → ids. More than one id models a duplicate.
    resources: HashMap<String, Vec<String>>,
    package_exists: bool,
}

/// A canned failure for the create POST.
#[derive(Debug, Clone)]
pub struct FailedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Fake Web API. Answers the handful of endpoints the engine uses.
pub struct FakeTransport {
    server: Mutex<Server>,
    cancel_on_create: Mutex<Option<CancellationToken>>,
    fail_creates: Mutex<Option<FailedResponse>>,
    calls: Mutex<Vec<Call>>,
    next_id: AtomicUsize,
    delay: Duration,
    activate_in_flight: AtomicUsize,
    activate_max: AtomicUsize,
    create_in_flight: AtomicUsize,
    create_max: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    /// Every call sleeps for `delay` so concurrent callers overlap.
    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            server: Mutex::new(Server {
                package_exists: true,
                ..Server::default()
            }),
            cancel_on_create: Mutex::new(None),
            fail_creates: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            delay,
            activate_in_flight: AtomicUsize::new(0),
            activate_max: AtomicUsize::new(0),
            create_in_flight: AtomicUsize::new(0),
            create_max: AtomicUsize::new(0),
        })
    }

    pub fn without_package(self: Arc<Self>) -> Arc<Self> {
        self.server.lock().unwrap().package_exists = false;
        self
    }

    /// Cancel `token` while a create request is on the wire. The create
    /// itself still succeeds.
    pub fn cancel_during_create(&self, token: CancellationToken) {
        *self.cancel_on_create.lock().unwrap() = Some(token);
    }

    /// Answer every create with `response` instead of a new record.
    pub fn fail_creates_with(&self, response: FailedResponse) {
        *self.fail_creates.lock().unwrap() = Some(response);
    }

    /// Seed an existing resource; returns its id.
    pub fn seed_resource(&self, name: &str) -> String {
        let id = self.fresh_id();
        self.server
            .lock()
            .unwrap()
            .resources
            .entry(name.to_string())
            .or_default()
            .push(id.clone());
        id
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn mutating_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method.is_mutating())
            .collect()
    }

    /// Calls whose path starts with `prefix`.
    pub fn calls_to(&self, prefix: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.starts_with(prefix))
            .collect()
    }

    pub fn creates(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == Method::Post && c.path == "webresourceset")
            .collect()
    }

    pub fn max_concurrent_activations(&self) -> usize {
        self.activate_max.load(Ordering::SeqCst)
    }

    pub fn max_concurrent_creates(&self) -> usize {
        self.create_max.load(Ordering::SeqCst)
    }

    fn fresh_id(&self) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        format!("00000000-0000-0000-0000-{n:012x}")
    }

    fn respond(&self, request: &ApiRequest) -> Result<ApiResponse, RemoteError> {
        let path = request.path.as_str();
        match request.method {
            Method::Get if path.starts_with("solutions?") => {
                let exists = self.server.lock().unwrap().package_exists;
                let value = if exists {
                    vec![json!({ "solutionid": PACKAGE_ID, "uniquename": "contoso_core" })]
                } else {
                    vec![]
                };
                Ok(ok(json!({ "value": value })))
            }
            Method::Get if path.starts_with("webresourceset?") => {
                let name = quoted_filter_value(path);
                let ids = self
                    .server
                    .lock()
                    .unwrap()
                    .resources
                    .get(&name)
                    .cloned()
                    .unwrap_or_default();
                let value: Vec<Value> = ids
                    .into_iter()
                    .map(|id| json!({ "webresourceid": id, "name": name }))
                    .collect();
                Ok(ok(json!({ "value": value })))
            }
            Method::Get if path.starts_with("solutioncomponents?") => Ok(ok(json!({ "value": [] }))),
            Method::Post if path == "webresourceset" => {
                if let Some(failed) = self.fail_creates.lock().unwrap().clone() {
                    return Err(webpub_remote::api_error(
                        failed.status,
                        &failed.headers,
                        failed.body,
                    ));
                }
                if let Some(cancel) = self.cancel_on_create.lock().unwrap().as_ref() {
                    cancel.cancel();
                }
                let name = request
                    .body
                    .as_ref()
                    .and_then(|b| b.get("name"))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let id = self.fresh_id();
                self.server
                    .lock()
                    .unwrap()
                    .resources
                    .entry(name)
                    .or_default()
                    .push(id.clone());
                Ok(ok(json!({ "webresourceid": id })))
            }
            Method::Patch if path.starts_with("webresourceset(") => Ok(no_content()),
            Method::Post if path == "AddSolutionComponent" || path == "PublishXml" => {
                Ok(no_content())
            }
            _ => Err(webpub_remote::api_error(
                404,
                &HashMap::new(),
                format!(r#"{{"error":{{"code":"0x0","message":"no route for {path}"}}}}"#),
            )),
        }
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, RemoteError> {
        let started = Instant::now();
        let gauge = match (request.method, request.path.as_str()) {
            (Method::Post, "PublishXml") => Some((&self.activate_in_flight, &self.activate_max)),
            (Method::Post, "webresourceset") => Some((&self.create_in_flight, &self.create_max)),
            _ => None,
        };
        if let Some((in_flight, max)) = gauge {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max.fetch_max(now, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let response = self.respond(&request);
        if let Some((in_flight, _)) = gauge {
            in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        self.calls.lock().unwrap().push(Call {
            method: request.method,
            path: request.path.clone(),
            started,
            finished: Instant::now(),
        });
        response
    }
}

fn ok(body: Value) -> ApiResponse {
    ApiResponse {
        status: 200,
        headers: HashMap::new(),
        body: Some(body),
    }
}

fn no_content() -> ApiResponse {
    ApiResponse {
        status: 204,
        headers: HashMap::new(),
        body: None,
    }
}

/// `...$filter=name%20eq%20%27pkg%2Fa.js%27` → `pkg/a.js`
fn quoted_filter_value(path: &str) -> String {
    let decoded = urlencoding::decode(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string());
    let start = decoded.find('\'').map(|i| i + 1).unwrap_or(0);
    let end = decoded.rfind('\'').unwrap_or(decoded.len());
    decoded[start..end].replace("''", "'")
}

/// Hands out the shared fake and counts connections.
pub struct FakeConnector {
    pub transport: Arc<FakeTransport>,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(transport: Arc<FakeTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            connects: AtomicUsize::new(0),
        })
    }
}

impl Connector for FakeConnector {
    fn connect(
        &self,
        _environment: &Environment,
        _token: AccessToken,
    ) -> Result<Arc<dyn Transport>, RemoteError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(self.transport.clone())
    }
}

/// Remembers every report so tests can assert "exactly once".
#[derive(Default)]
pub struct RecordingReporter {
    pub headers: AtomicUsize,
    pub steps: Mutex<Vec<(PathBuf, PublishStep)>>,
    pub finished: Mutex<Vec<(PathBuf, FileOutcome)>>,
}

impl Reporter for RecordingReporter {
    fn batch_header(&self, _environment: &Environment, _binding: &Binding) {
        self.headers.fetch_add(1, Ordering::SeqCst);
    }

    fn step(&self, path: &Path, step: PublishStep) {
        self.steps.lock().unwrap().push((path.to_path_buf(), step));
    }

    fn finished(&self, path: &Path, outcome: &FileOutcome) {
        self.finished
            .lock()
            .unwrap()
            .push((path.to_path_buf(), outcome.clone()));
    }
}

pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub connector: Arc<FakeConnector>,
    pub reporter: Arc<RecordingReporter>,
    pub publisher: Publisher,
}

impl Harness {
    pub fn new(transport: Arc<FakeTransport>) -> Self {
        let connector = FakeConnector::new(transport.clone());
        let reporter = Arc::new(RecordingReporter::default());
        let publisher = Publisher::new(connector.clone(), reporter.clone());
        Self {
            transport,
            connector,
            reporter,
            publisher,
        }
    }
}

pub fn environment(create_missing_resources: bool) -> Environment {
    Environment {
        name: EnvironmentName::from("Dev"),
        url: "https://contoso-dev.example.com".to_string(),
        create_missing_resources,
        token_env: None,
        api_version: None,
    }
}

pub fn token() -> AuthContext {
    AuthContext::Token(AccessToken::new("test-token"))
}

pub fn folder_binding(local: &Path, remote: &str, package: &str) -> Binding {
    Binding {
        local_path: local.to_path_buf(),
        remote_path: remote.to_string(),
        package_name: PackageName::from(package),
        kind: BindingKind::Folder,
    }
}

pub fn file_binding(local: &Path, remote: &str, package: &str) -> Binding {
    Binding {
        local_path: local.to_path_buf(),
        remote_path: remote.to_string(),
        package_name: PackageName::from(package),
        kind: BindingKind::File,
    }
}

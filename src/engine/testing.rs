//! Scripted doubles for the engine's collaborators.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use super::account::{Account, AccountResult, Credential};
use super::classify::ClassifierRules;
use super::service::{Service, Step, StepHistory, StepSpec, DEFAULT_STEPS};
use crate::refresh::{CredentialRefresher, RefreshOutcome};
use crate::transport::{Method, Request, Response, Transport, TransportError};

pub(crate) const TEST_RULES: ClassifierRules = ClassifierRules {
    code_field: Some("code"),
    success_codes: &[0],
    success_flag: None,
    message_fields: &["message"],
    already_done_patterns: &["already"],
    already_done_on_server_error: false,
    bare_success: false,
};

const TOKEN_HEADER: &str = "x-token";

pub(crate) fn test_account(label: &str, token: &str) -> Account {
    Account::new(Credential::new(label).with("token", token))
}

/// An account whose credential must be refreshed before any request.
pub(crate) fn stale_account(label: &str) -> Account {
    let mut credential = Credential::new(label).with("token", "");
    credential.mark_stale();
    Account::new(credential)
}

pub(crate) fn token_request(account: &Account) -> Request {
    Request::new(Method::Get, "https://svc.test/step")
        .header(TOKEN_HEADER, account.credential().value("token"))
}

#[derive(Debug, Clone)]
pub(crate) enum MockReply {
    Json(u16, Value),
    Opaque(u16),
    NetworkDown,
}

impl MockReply {
    /// HTTP 200 with application code 0 merged into `body`.
    pub(crate) fn ok(body: Value) -> Self {
        let mut body = match body {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        body.insert("code".to_string(), json!(0));
        MockReply::Json(200, Value::Object(body))
    }

    pub(crate) fn json(status: u16, body: Value) -> Self {
        MockReply::Json(status, body)
    }

    pub(crate) fn status(status: u16) -> Self {
        MockReply::Opaque(status)
    }

    fn to_result(&self) -> Result<Response, TransportError> {
        match self {
            MockReply::Json(status, body) => Ok(Response::json(*status, body.clone())),
            MockReply::Opaque(status) => Ok(Response::opaque(*status)),
            MockReply::NetworkDown => Err(TransportError::Connect("connection reset".into())),
        }
    }
}

#[derive(Default)]
struct Script {
    queue: VecDeque<MockReply>,
    fallback: Option<MockReply>,
}

/// Transport answering from per-key scripts.
///
/// The key is the `x-token` header, optionally followed by a space and the
/// last URL path segment (`"tok-a action"`). The more specific key wins.
#[derive(Default)]
pub(crate) struct MockTransport {
    scripts: Mutex<HashMap<String, Script>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` every time `key` is requested.
    pub(crate) fn always(self, key: &str, reply: MockReply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .fallback = Some(reply);
        self
    }

    /// Reply with `replies` in order; afterwards fall back to `always`, if set.
    pub(crate) fn script(self, key: &str, replies: Vec<MockReply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .queue
            .extend(replies);
        self
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub(crate) fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requested_paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| last_segment(&r.url).to_string())
            .collect()
    }

    fn next_reply(&self, request: &Request) -> Option<MockReply> {
        let token = request.header_value(TOKEN_HEADER).unwrap_or_default();
        let specific = format!("{} {}", token, last_segment(&request.url));
        let mut scripts = self.scripts.lock().unwrap();
        for key in [specific.as_str(), token] {
            if let Some(script) = scripts.get_mut(key) {
                if let Some(reply) = script.queue.pop_front() {
                    return Some(reply);
                }
                if let Some(reply) = &script.fallback {
                    return Some(reply.clone());
                }
            }
        }
        None
    }
}

fn last_segment(url: &str) -> &str {
    let path = url.split('?').next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        match self.next_reply(request) {
            Some(reply) => reply.to_result(),
            None => Err(TransportError::Connect(format!(
                "no scripted reply for {}",
                request.url
            ))),
        }
    }
}

/// Refresher that always yields the same outcome and counts its calls.
pub(crate) struct ScriptedRefresher {
    new_token: Option<String>,
    failure: String,
    calls: AtomicU32,
}

impl ScriptedRefresher {
    pub(crate) fn succeeding(new_token: &str) -> Self {
        Self {
            new_token: Some(new_token.to_string()),
            failure: String::new(),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn failing(reason: &str) -> Self {
        Self {
            new_token: None,
            failure: reason.to_string(),
            calls: AtomicU32::new(0),
        }
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CredentialRefresher for ScriptedRefresher {
    async fn refresh(&self, account: &Account) -> RefreshOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.new_token {
            Some(token) => {
                let mut credential = account.credential().clone();
                credential.set("token", token.clone());
                RefreshOutcome::Refreshed(credential)
            }
            None => RefreshOutcome::Failed(self.failure.clone()),
        }
    }
}

const ACTION_ONLY: [StepSpec; 1] = [StepSpec::required(Step::PerformAction)];

const OPTIONAL_CONFIRMATION: [StepSpec; 3] = [
    StepSpec::required(Step::QueryState),
    StepSpec::required(Step::PerformAction),
    StepSpec::optional(Step::QueryConfirmation),
];

/// Service hitting `/state`, `/action` and `/confirm` with an `x-token` header.
pub(crate) struct TestService {
    steps: &'static [StepSpec],
}

impl Default for TestService {
    fn default() -> Self {
        Self {
            steps: &DEFAULT_STEPS,
        }
    }
}

impl TestService {
    pub(crate) fn action_only() -> Self {
        Self {
            steps: &ACTION_ONLY,
        }
    }

    pub(crate) fn with_optional_confirmation() -> Self {
        Self {
            steps: &OPTIONAL_CONFIRMATION,
        }
    }
}

impl Service for TestService {
    fn name(&self) -> &str {
        "Test"
    }

    fn rules(&self, _step: Step) -> &ClassifierRules {
        &TEST_RULES
    }

    fn steps(&self) -> &[StepSpec] {
        self.steps
    }

    fn build_request(&self, step: Step, account: &Account) -> Request {
        let path = match step {
            Step::QueryState => "state",
            Step::PerformAction => "action",
            Step::QueryConfirmation => "confirm",
        };
        Request::new(Method::Post, format!("https://svc.test/{path}"))
            .header(TOKEN_HEADER, account.credential().value("token"))
    }

    fn reports_done(&self, state: &Value) -> bool {
        state.get("done").and_then(Value::as_bool).unwrap_or(false)
    }

    fn merge(
        &self,
        step: Step,
        payload: &Value,
        _history: &StepHistory,
        result: &mut AccountResult,
    ) {
        match step {
            Step::PerformAction => {
                if let Some(gain) = payload.get("gain") {
                    result.set_field("Gain", gain.to_string());
                }
            }
            Step::QueryConfirmation => {
                if let Some(points) = payload.get("points") {
                    result.set_field("Points", points.to_string());
                }
            }
            Step::QueryState => {}
        }
    }
}

//! SVYUN (速维云) console daily check-in.

use std::time::Duration;

use serde_json::Value;

use super::{entries, label_or_position, plain_text};
use crate::config::AccountSource;
use crate::engine::{
    Account, AccountResult, ClassifierRules, Credential, Service, Step, StepHistory, StepSpec,
};
use crate::transport::{Method, Request};

const BASE_URL: &str = "https://www.svyun.com";
const ORIGIN: &str = "https://www.svyun.com";
const REFERER: &str = "https://www.svyun.com/plugin/86/index.htm";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36";
const TIMEOUT: Duration = Duration::from_secs(15);

const STEPS: [StepSpec; 3] = [
    StepSpec::required(Step::QueryState),
    StepSpec::required(Step::PerformAction),
    StepSpec::optional(Step::QueryConfirmation),
];

const RULES: ClassifierRules = ClassifierRules {
    code_field: Some("status"),
    success_codes: &[200],
    success_flag: None,
    message_fields: &["msg", "message"],
    already_done_patterns: &["已签到", "already checked"],
    already_done_on_server_error: false,
    bare_success: false,
};

pub struct SvyunService {
    user_agent: String,
}

impl SvyunService {
    pub fn new(user_agent: Option<String>) -> Self {
        Self {
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

impl Service for SvyunService {
    fn name(&self) -> &str {
        "SVYUN"
    }

    fn rules(&self, _step: Step) -> &ClassifierRules {
        &RULES
    }

    fn steps(&self) -> &[StepSpec] {
        &STEPS
    }

    fn build_request(&self, step: Step, account: &Account) -> Request {
        let credential = account.credential();
        let request = match step {
            Step::PerformAction => {
                Request::new(Method::Post, format!("{BASE_URL}/console/v1/daily_checkin/checkin"))
                    .header("content-type", "application/json")
                    .body("{}")
            }
            Step::QueryState | Step::QueryConfirmation => {
                Request::new(Method::Get, format!("{BASE_URL}/console/v1/daily_checkin/info"))
            }
        };
        request
            .header("authorization", credential.value("token"))
            .header("cookie", credential.value("cookie"))
            .header("user-agent", self.user_agent.as_str())
            .header("accept", "application/json, text/plain, */*")
            .header("x-requested-with", "XMLHttpRequest")
            .header("origin", ORIGIN)
            .header("referer", REFERER)
            .timeout(TIMEOUT)
    }

    fn reports_done(&self, state: &Value) -> bool {
        state
            .pointer("/data/info/today_checked")
            .is_some_and(is_truthy)
    }

    fn merge(
        &self,
        step: Step,
        payload: &Value,
        _history: &StepHistory,
        result: &mut AccountResult,
    ) {
        match step {
            Step::QueryState | Step::QueryConfirmation => {
                let Some(info) = payload.pointer("/data/info") else {
                    return;
                };
                if let Some(total) = info.get("total_checkins").filter(|v| !v.is_null()) {
                    result.set_field("Total check-ins", plain_text(total));
                }
                if let Some(streak) = info.get("current_streak").filter(|v| !v.is_null()) {
                    result.set_field("Current streak", plain_text(streak));
                }
            }
            Step::PerformAction => {
                if let Some(message) = RULES.message(payload) {
                    result.set_field("Server message", message);
                }
            }
        }
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        _ => false,
    }
}

/// Ensure the token carries exactly one `Bearer ` scheme prefix.
fn normalize_token(token: &str) -> String {
    let token = token.trim();
    if raw_jwt(token).len() < token.len() {
        token.to_string()
    } else {
        format!("Bearer {token}")
    }
}

fn raw_jwt(token: &str) -> &str {
    let token = token.trim();
    match token.split_once(char::is_whitespace) {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => token,
    }
}

/// Parse `TOKEN#COOKIE#remark` entries. Without a cookie, `idcsmart_jwt=<jwt>` is used.
pub fn parse_accounts(source: &AccountSource) -> Vec<Account> {
    let mut accounts = Vec::new();
    for [token, cookie, remark] in entries::<3>(source) {
        if token.is_empty() {
            tracing::warn!("Skipping SVYUN entry without a token");
            continue;
        }
        let cookie = if cookie.is_empty() {
            format!("idcsmart_jwt={}", raw_jwt(token))
        } else {
            cookie.to_string()
        };
        let credential = Credential::new(label_or_position(remark, accounts.len() + 1))
            .with("token", normalize_token(token))
            .with("cookie", cookie);
        accounts.push(Account::new(credential));
    }
    accounts
}

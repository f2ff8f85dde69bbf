//! ACCK sign service.
//!
//! Sits behind Cloudflare: every request carries a JWT `authorization` header
//! plus the `cf_clearance` cookie, and the cookie expires far sooner than the
//! JWT. This is the one service wired to a credential refresher.

use std::time::Duration;

use serde_json::Value;

use super::{entries, label_or_position};
use crate::config::AccountSource;
use crate::engine::{
    Account, AccountResult, ClassifierRules, Credential, Service, Step, StepHistory,
};
use crate::transport::{Method, Request};

const BASE_URL: &str = "https://sign-service.acck.io";
const USER_AGENT: &str = "Mozilla/5.0 (ACCK Sign Script)";
const TIMEOUT: Duration = Duration::from_secs(10);

pub const AUTHORIZATION: &str = "authorization";
pub const CF_CLEARANCE: &str = "cf_clearance";

const RULES: ClassifierRules = ClassifierRules {
    code_field: Some("code"),
    success_codes: &[200],
    success_flag: None,
    message_fields: &["message", "msg"],
    already_done_patterns: &["已签到", "already signed"],
    already_done_on_server_error: false,
    bare_success: true,
};

/// The sign call only counts once the service answers with code 200.
const SIGN_RULES: ClassifierRules = ClassifierRules {
    bare_success: false,
    ..RULES
};

pub struct AcckService;

impl Service for AcckService {
    fn name(&self) -> &str {
        "ACCK"
    }

    fn rules(&self, step: Step) -> &ClassifierRules {
        match step {
            Step::PerformAction => &SIGN_RULES,
            Step::QueryState | Step::QueryConfirmation => &RULES,
        }
    }

    fn build_request(&self, step: Step, account: &Account) -> Request {
        let path = match step {
            Step::QueryState => "/api/acLogs/signStatus",
            Step::PerformAction => "/api/acLogs/sign",
            Step::QueryConfirmation => "/api/users/getUserInfo",
        };
        let credential = account.credential();
        Request::new(Method::Get, format!("{BASE_URL}{path}"))
            .header("authorization", credential.value(AUTHORIZATION))
            .header("cookie", format!("cf_clearance={}", credential.value(CF_CLEARANCE)))
            .header("user-agent", USER_AGENT)
            .timeout(TIMEOUT)
    }

    fn reports_done(&self, state: &Value) -> bool {
        state.get("data").and_then(Value::as_bool) == Some(true)
    }

    fn merge(
        &self,
        step: Step,
        payload: &Value,
        _history: &StepHistory,
        result: &mut AccountResult,
    ) {
        if step != Step::QueryConfirmation {
            return;
        }
        if let Some(points) = payload.pointer("/data/jifen").filter(|v| v.is_number()) {
            result.set_field("Points", points.to_string());
        }
    }
}

/// Parse `AUTHORIZATION#CF_CLEARANCE#remark` entries.
///
/// An entry without a `cf_clearance` is only accepted when a refresher is
/// configured; its credential starts stale so the cookie is fetched first.
pub fn parse_accounts(source: &AccountSource, can_refresh: bool) -> Vec<Account> {
    let mut accounts = Vec::new();
    for (index, [jwt, cf, remark]) in entries::<3>(source).into_iter().enumerate() {
        if jwt.is_empty() {
            tracing::warn!("ACCK entry {} has no authorization token, skipping", index + 1);
            continue;
        }
        if cf.is_empty() && !can_refresh {
            tracing::warn!(
                "ACCK entry {} has no cf_clearance and no refresh command is configured, skipping",
                index + 1
            );
            continue;
        }
        let mut credential = Credential::new(label_or_position(remark, accounts.len() + 1))
            .with(AUTHORIZATION, jwt)
            .with(CF_CLEARANCE, cf);
        if cf.is_empty() {
            credential.mark_stale();
        }
        accounts.push(Account::new(credential));
    }
    accounts
}

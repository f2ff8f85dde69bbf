//! Skland (森空岛) attendance for Arknights: Endfield.
//!
//! Both the calendar query and the sign-in hit the same endpoint (GET then
//! POST). Each request is signed with `md5(path + body + timestamp + salt)`
//! unless a captured `sign` header was configured.

use std::time::Duration;

use md5::{Digest, Md5};
use serde_json::Value;

use super::{entries, label_or_position, plain_text};
use crate::config::AccountSource;
use crate::engine::{
    Account, AccountResult, ClassifierRules, Credential, Service, Step, StepHistory, StepSpec,
};
use crate::transport::{Method, Request};

const BASE_URL: &str = "https://zonai.skland.com";
const ENDPOINT: &str = "/web/v1/game/endfield/attendance";
const TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_SIGN_SALT: &str = "c2594619f518e388fcc24a806020c78a";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 16; 23078RKD5C Build/BP2A.250605.031.A3; wv) AppleWebKit/537.36 (KHTML, like Gecko) Version/4.0 Chrome/144.0.7559.59 Mobile Safari/537.36; SKLand/1.52.1";
const DEFAULT_VNAME: &str = "1.0.0";
const DEFAULT_PLATFORM: &str = "3";

const STEPS: [StepSpec; 2] = [
    StepSpec::required(Step::QueryState),
    StepSpec::required(Step::PerformAction),
];

const RULES: ClassifierRules = ClassifierRules {
    code_field: Some("code"),
    success_codes: &[0],
    success_flag: None,
    message_fields: &["message"],
    already_done_patterns: &["已经", "已签到", "already", "repeat"],
    already_done_on_server_error: false,
    bare_success: false,
};

pub struct SklandService {
    /// Fixed `timestamp` header; the current Unix time when unset.
    timestamp: Option<String>,
}

impl SklandService {
    pub fn new(timestamp: Option<String>) -> Self {
        Self { timestamp }
    }

    fn timestamp(&self) -> String {
        match self.timestamp.as_deref().map(str::trim) {
            Some(ts) if !ts.is_empty() => ts.to_string(),
            _ => chrono::Utc::now().timestamp().to_string(),
        }
    }
}

pub(crate) fn generate_sign(path: &str, body: &str, timestamp: &str, salt: &str) -> String {
    let digest = Md5::digest(format!("{path}{body}{timestamp}{salt}").as_bytes());
    format!("{digest:x}")
}

impl Service for SklandService {
    fn name(&self) -> &str {
        "Skland Endfield"
    }

    fn rules(&self, _step: Step) -> &ClassifierRules {
        &RULES
    }

    fn steps(&self) -> &[StepSpec] {
        &STEPS
    }

    fn build_request(&self, step: Step, account: &Account) -> Request {
        let method = match step {
            Step::PerformAction => Method::Post,
            Step::QueryState | Step::QueryConfirmation => Method::Get,
        };
        let credential = account.credential();
        let timestamp = self.timestamp();
        let sign = match credential.get("sign").filter(|s| !s.is_empty()) {
            Some(captured) => captured.to_string(),
            None => generate_sign(
                ENDPOINT,
                "",
                &timestamp,
                account.param("sign_salt").unwrap_or(DEFAULT_SIGN_SALT),
            ),
        };

        let mut request = Request::new(method, format!("{BASE_URL}{ENDPOINT}"))
            .header("cred", credential.value("cred"))
            .header("sign", sign)
            .header("did", account.param("did").unwrap_or_default())
            .header("sk-game-role", account.param("role").unwrap_or_default())
            .header("timestamp", timestamp)
            .header("vname", account.param("vname").unwrap_or(DEFAULT_VNAME))
            .header("platform", account.param("platform").unwrap_or(DEFAULT_PLATFORM))
            .header("user-agent", account.param("user_agent").unwrap_or(DEFAULT_USER_AGENT))
            .header("content-type", "application/json")
            .header("accept", "*/*")
            .header("origin", "https://game.skland.com")
            .header("referer", "https://game.skland.com/")
            .header("x-requested-with", "com.hypergryph.skland")
            .timeout(TIMEOUT);
        if method == Method::Post {
            request = request.body("");
        }
        request
    }

    fn merge(
        &self,
        step: Step,
        payload: &Value,
        history: &StepHistory,
        result: &mut AccountResult,
    ) {
        if step != Step::PerformAction {
            return;
        }
        let state_map = history
            .get(Step::QueryState)
            .and_then(|s| s.pointer("/data/resourceInfoMap"));
        let data = payload.get("data");
        let resources = data
            .and_then(|d| d.get("resourceInfoMap"))
            .filter(|m| m.is_object())
            .or(state_map);

        let today = data
            .and_then(|d| d.get("awardIds"))
            .map(|ids| format_awards(ids, resources))
            .unwrap_or_default();
        if !today.is_empty() {
            result.set_field("Today's rewards", today.join(", "));
            let tomorrow = data
                .and_then(|d| d.get("tomorrowAwardIds"))
                .map(|ids| format_awards(ids, resources))
                .unwrap_or_default();
            if !tomorrow.is_empty() {
                result.set_field("Tomorrow's rewards", tomorrow.join(", "));
            }
            return;
        }

        // Already signed: report the most recent claimed calendar reward.
        let last_done = history
            .get(Step::QueryState)
            .and_then(|s| s.pointer("/data/calendar"))
            .and_then(Value::as_array)
            .and_then(|calendar| {
                calendar
                    .iter()
                    .rev()
                    .find(|item| item.get("done").and_then(Value::as_bool) == Some(true))
            })
            .and_then(|item| item.get("awardId"))
            .cloned();
        let text = match last_done {
            Some(id) => {
                let ids = Value::Array(vec![serde_json::json!({ "awardId": id })]);
                format_awards(&ids, state_map).join(", ")
            }
            None => "none".to_string(),
        };
        result.set_field("Today's rewards", text);
    }
}

/// Render award references as `name xcount`, falling back to the raw id.
fn format_awards(ids: &Value, resources: Option<&Value>) -> Vec<String> {
    let Some(items) = ids.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| {
            let id = item
                .get("id")
                .filter(|v| !v.is_null())
                .or_else(|| item.get("awardId"))
                .map(plain_text)
                .unwrap_or_default();
            let info = resources.and_then(|m| m.get(id.as_str()));
            match info {
                Some(info) => {
                    let name = info.get("name").and_then(Value::as_str).unwrap_or(&id);
                    let count = info.get("count").map(plain_text).unwrap_or_else(|| "1".into());
                    format!("{name} x{count}")
                }
                None if id.is_empty() => "unknown reward".to_string(),
                None => id,
            }
        })
        .collect()
}

/// Parse `CRED#DID#ROLE#USER_AGENT#VNAME#PLATFORM#SIGN_SALT#SIGN#remark` entries.
///
/// `cred`, `did` and `role` are required; entries missing any are dropped.
pub fn parse_accounts(source: &AccountSource) -> Vec<Account> {
    let mut accounts = Vec::new();
    for (index, fields) in entries::<9>(source).into_iter().enumerate() {
        let [cred, did, role, user_agent, vname, platform, salt, sign, remark] = fields;
        if cred.is_empty() || did.is_empty() || role.is_empty() {
            tracing::warn!(
                "Skland entry {} is incomplete, cred/did/role are required",
                index + 1
            );
            continue;
        }
        let mut credential =
            Credential::new(label_or_position(remark, accounts.len() + 1)).with("cred", cred);
        if !sign.is_empty() {
            credential = credential.with("sign", sign);
        }
        let mut account = Account::new(credential)
            .with_param("did", did)
            .with_param("role", role);
        for (key, value) in [
            ("user_agent", user_agent),
            ("vname", vname),
            ("platform", platform),
            ("sign_salt", salt),
        ] {
            if !value.is_empty() {
                account = account.with_param(key, value);
            }
        }
        accounts.push(account);
    }
    accounts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::listed;
    use crate::engine::testing::{MockReply, MockTransport};
    use crate::engine::{StepExecutor, WorkflowRunner};
    use crate::retry::RetryConfig;
    use serde_json::json;

    #[test]
    fn test_generate_sign_is_md5_hex() {
        assert_eq!(generate_sign("", "", "", ""), "d41d8cd98f00b204e9800998ecf8427e");
        let sign = generate_sign(ENDPOINT, "", "1700000000", DEFAULT_SIGN_SALT);
        assert_eq!(sign.len(), 32);
        assert!(sign.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_parse_accounts_requires_cred_did_role() {
        let accounts = parse_accounts(&listed(
            "c1#d1#r1\nc2#d2\nc3#d3#r3#ua#2.0.0#1#salt#captured#alt",
        ));
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].label(), "Account 1");
        assert_eq!(accounts[0].param("vname"), None);
        assert_eq!(accounts[1].label(), "alt");
        assert_eq!(accounts[1].param("vname"), Some("2.0.0"));
        assert_eq!(accounts[1].credential().get("sign"), Some("captured"));
    }

    #[test]
    fn test_request_is_signed_with_fixed_timestamp() {
        let service = SklandService::new(Some("1700000000".into()));
        let account = parse_accounts(&listed("cred1#did1#role1")).remove(0);
        let req = service.build_request(Step::PerformAction, &account);
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header_value("timestamp"), Some("1700000000"));
        let expected = generate_sign(ENDPOINT, "", "1700000000", DEFAULT_SIGN_SALT);
        assert_eq!(req.header_value("sign"), Some(expected.as_str()));
        assert_eq!(req.header_value("sk-game-role"), Some("role1"));
        assert_eq!(req.header_value("platform"), Some("3"));
    }

    #[test]
    fn test_captured_sign_wins() {
        let service = SklandService::new(None);
        let account = parse_accounts(&listed("c#d#r#####abc")).remove(0);
        let req = service.build_request(Step::QueryState, &account);
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.header_value("sign"), Some("abc"));
    }

    fn calendar() -> MockReply {
        MockReply::json(
            200,
            json!({"code": 0, "message": "OK", "data": {
                "resourceInfoMap": {
                    "r1": {"name": "Oroberyl", "count": 80},
                    "r2": {"name": "T-Creds", "count": "2000"},
                },
                "calendar": [
                    {"awardId": "r1", "done": true},
                    {"awardId": "r2", "done": true},
                    {"awardId": "r1", "done": false},
                ],
            }}),
        )
    }

    async fn run(sign_reply: MockReply) -> AccountResult {
        let transport = MockTransport::new().script("", vec![calendar(), sign_reply]);
        let retry = RetryConfig {
            max_attempts: 2,
            delay: Duration::ZERO,
        };
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = parse_accounts(&listed("c#d#r")).remove(0);
        runner.run(&SklandService::new(None), &mut account).await
    }

    #[test]
    fn test_format_awards_unquotes_string_counts() {
        let resources = json!({
            "r1": {"name": "Oroberyl", "count": "80"},
            "r2": {"name": "T-Creds"},
        });
        let ids = json!([{"id": "r1"}, {"awardId": "r2"}, {"id": 7}]);
        assert_eq!(
            format_awards(&ids, Some(&resources)),
            vec!["Oroberyl x80", "T-Creds x1", "7"]
        );
    }

    #[tokio::test]
    async fn test_fresh_sign_reports_awards() {
        let result = run(MockReply::json(
            200,
            json!({"code": 0, "message": "OK", "data": {
                "awardIds": [{"id": "r1"}],
                "tomorrowAwardIds": [{"id": "r2"}, {"id": "zz"}],
            }}),
        ))
        .await;
        assert!(result.success);
        assert!(result.performed);
        assert_eq!(result.field("Today's rewards"), Some("Oroberyl x80"));
        assert_eq!(result.field("Tomorrow's rewards"), Some("T-Creds x2000, zz"));
    }

    #[tokio::test]
    async fn test_already_signed_reports_last_claimed_award() {
        let result = run(MockReply::json(
            200,
            json!({"code": 10001, "message": "请勿重复签到，今天已经签到过了"}),
        ))
        .await;
        assert!(result.success);
        assert!(!result.performed);
        assert_eq!(result.field("Today's rewards"), Some("T-Creds x2000"));
    }

    #[tokio::test]
    async fn test_signature_rejection_is_fatal() {
        let result =
            run(MockReply::json(200, json!({"code": 10000, "message": "sign error"}))).await;
        assert!(!result.success);
        assert!(result.message.contains("sign error"));
    }
}

//! NodeSeek / DeepFlood forum attendance.
//!
//! Both forums run the same software: a single `POST /api/attendance` with the
//! browser session cookie. A repeated attendance is reported either as a 2xx
//! with `success: false` or as an HTTP 500, both carrying an "already" message.

use std::time::Duration;

use serde_json::Value;

use super::{plain_text, split_entries};
use crate::config::AccountSource;
use crate::engine::{
    Account, AccountResult, ClassifierRules, Credential, Service, Step, StepHistory, StepSpec,
};
use crate::transport::{Method, Request};
use crate::types::SignType;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/144.0.0.0 Safari/537.36 Edg/144.0.0.0";

const STEPS: [StepSpec; 1] = [StepSpec::required(Step::PerformAction)];

const RULES: ClassifierRules = ClassifierRules {
    code_field: None,
    success_codes: &[],
    success_flag: Some("success"),
    message_fields: &["message"],
    already_done_patterns: &["已经签到", "已完成签到", "重复操作", "Have attended"],
    already_done_on_server_error: true,
    bare_success: false,
};

/// Static description of one forum.
#[derive(Debug)]
pub struct Site {
    pub name: &'static str,
    pub origin: &'static str,
    pub referer: &'static str,
    pub fixed_url: &'static str,
    pub random_url: &'static str,
    pub timeout: Duration,
    pub extra_headers: &'static [(&'static str, &'static str)],
}

pub static NODESEEK: Site = Site {
    name: "NodeSeek",
    origin: "https://www.nodeseek.com",
    referer: "https://www.nodeseek.com/board",
    fixed_url: "https://www.nodeseek.com/api/attendance",
    random_url: "https://www.nodeseek.com/api/attendance?random=true",
    timeout: Duration::from_secs(15),
    extra_headers: &[],
};

pub static DEEPFLOOD: Site = Site {
    name: "DeepFlood",
    origin: "https://www.deepflood.com",
    referer: "https://www.deepflood.com/sw.js?v=0.3.33",
    fixed_url: "https://www.deepflood.com/api/attendance?random=false",
    random_url: "https://www.deepflood.com/api/attendance?random=true",
    timeout: Duration::from_secs(20),
    extra_headers: &[("refract-version", "0.3.33")],
};

pub struct AttendanceService {
    site: &'static Site,
    sign_type: SignType,
    user_agent: String,
    custom_headers: Vec<(String, String)>,
}

impl AttendanceService {
    pub fn new(
        site: &'static Site,
        sign_type: SignType,
        user_agent: Option<String>,
        custom_headers: Vec<(String, String)>,
    ) -> Self {
        Self {
            site,
            sign_type,
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            custom_headers,
        }
    }

    fn url(&self) -> &'static str {
        match self.sign_type {
            SignType::Fixed => self.site.fixed_url,
            SignType::Random => self.site.random_url,
        }
    }
}

impl Service for AttendanceService {
    fn name(&self) -> &str {
        self.site.name
    }

    fn rules(&self, _step: Step) -> &ClassifierRules {
        &RULES
    }

    fn steps(&self) -> &[StepSpec] {
        &STEPS
    }

    fn build_request(&self, _step: Step, account: &Account) -> Request {
        Request::new(Method::Post, self.url())
            .header("User-Agent", self.user_agent.as_str())
            .header("Content-Type", "application/json")
            .header("X-Requested-With", "XMLHttpRequest")
            .header("Origin", self.site.origin)
            .header("Referer", self.site.referer)
            .header("Cookie", account.credential().value("cookie"))
            .header("Accept", "*/*")
            .header("Sec-Fetch-Dest", "empty")
            .header("Sec-Fetch-Mode", "cors")
            .header("Sec-Fetch-Site", "same-origin")
            .header("Priority", "u=1, i")
            .header("Pragma", "no-cache")
            .header("Cache-Control", "no-cache")
            .headers(self.site.extra_headers.iter().copied())
            .headers(self.custom_headers.iter().cloned())
            .body("{}")
            .timeout(self.site.timeout)
    }

    fn merge(
        &self,
        _step: Step,
        payload: &Value,
        _history: &StepHistory,
        result: &mut AccountResult,
    ) {
        if let Some(message) = RULES.message(payload) {
            result.set_field("Server message", message);
        }
        if let Some(gain) = payload.get("gain").filter(|v| !v.is_null()) {
            result.set_field("Gained", plain_text(gain));
        }
        if let Some(current) = payload.get("current").filter(|v| !v.is_null()) {
            result.set_field("Balance", plain_text(current));
        }
    }
}

/// One account per cookie entry; labels are positional.
///
/// Cookies are taken whole: `#` is an ordinary cookie character here.
pub fn parse_accounts(source: &AccountSource) -> Vec<Account> {
    let cookies: Vec<&str> = match source {
        AccountSource::List(raw) => split_entries(raw),
        AccountSource::Single(values) => values
            .iter()
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .take(1)
            .collect(),
    };
    cookies
        .into_iter()
        .enumerate()
        .map(|(i, cookie)| {
            Account::new(Credential::new(format!("Account {}", i + 1)).with("cookie", cookie))
        })
        .collect()
}

/// Parse the optional JSON object of extra headers; invalid input is ignored.
pub fn parse_custom_headers(raw: &str) -> Vec<(String, String)> {
    match serde_json::from_str::<serde_json::Map<String, Value>>(raw) {
        Ok(map) => map
            .into_iter()
            .map(|(k, v)| (k, plain_text(&v)))
            .collect(),
        Err(e) => {
            tracing::warn!("Ignoring custom headers, not a JSON object: {}", e);
            Vec::new()
        }
    }
}

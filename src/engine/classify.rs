//! Response classification.
//!
//! Every service answers with some mix of HTTP status, a boolean success
//! flag, an application code and a free-text message. [`ClassifierRules`]
//! names which of those a service uses; [`classify`] turns one transport
//! outcome into exactly one [`StepOutcome`].

use serde_json::Value;

use super::error::CheckinError;
use crate::transport::{Response, TransportError};

/// HTTP statuses and application codes that mean "credential rejected".
const AUTH_CODES: [i64; 2] = [401, 403];

const MESSAGE_SNIPPET_LEN: usize = 120;

/// Classified result of one network attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// The request did what it was asked; carries the response body.
    Success(Value),
    /// The action had already been performed earlier.
    AlreadyDone(Value),
    Unauthorized,
    /// Worth retrying; carries a description of the cause.
    TransientFailure(String),
    FatalFailure(CheckinError),
}

/// Declarative per-service classification rules.
#[derive(Debug, Clone)]
pub struct ClassifierRules {
    /// Body field carrying the numeric application code (`code`, `status`).
    pub code_field: Option<&'static str>,
    pub success_codes: &'static [i64],
    /// Body field carrying a boolean success flag.
    pub success_flag: Option<&'static str>,
    /// Body fields searched, in order, for a human-readable message.
    pub message_fields: &'static [&'static str],
    /// Case-insensitive substrings meaning "already done today".
    pub already_done_patterns: &'static [&'static str],
    /// Treat HTTP 500 plus an already-done message as AlreadyDone.
    ///
    /// Some services report a repeated check-in through a server error. The
    /// quirk is kept to status 500 only.
    pub already_done_on_server_error: bool,
    /// A 2xx JSON body with neither code nor flag counts as Success.
    pub bare_success: bool,
}

impl ClassifierRules {
    pub(crate) fn message<'a>(&self, body: &'a Value) -> Option<&'a str> {
        self.message_fields
            .iter()
            .find_map(|field| body.get(*field).and_then(Value::as_str))
            .filter(|m| !m.is_empty())
    }

    pub(crate) fn app_code(&self, body: &Value) -> Option<i64> {
        let field = self.code_field?;
        match body.get(field)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn flag(&self, body: &Value) -> Option<bool> {
        body.get(self.success_flag?)?.as_bool()
    }

    pub fn is_already_done_message(&self, message: &str) -> bool {
        let lowered = message.to_lowercase();
        self.already_done_patterns
            .iter()
            .any(|p| lowered.contains(&p.to_lowercase()))
    }

    /// Short description of a rejection: the service message if any,
    /// otherwise a truncated dump of the body.
    fn describe(&self, body: &Value) -> String {
        if let Some(message) = self.message(body) {
            return message.to_string();
        }
        let dump = body.to_string();
        if dump.chars().count() > MESSAGE_SNIPPET_LEN {
            let cut: String = dump.chars().take(MESSAGE_SNIPPET_LEN).collect();
            format!("{cut}...")
        } else {
            dump
        }
    }
}

/// Map a transport outcome to a [`StepOutcome`].
///
/// Order matters: network failure, then authorization, then the HTTP 500
/// already-done quirk, then 2xx success/already-done, then application-level
/// rejection. Anything left is transient.
pub fn classify(
    rules: &ClassifierRules,
    outcome: Result<&Response, &TransportError>,
) -> StepOutcome {
    let response = match outcome {
        Ok(r) => r,
        // Rebuilding the same request cannot fix a malformed header.
        Err(e) if matches!(e, TransportError::InvalidRequest(_)) => {
            return StepOutcome::FatalFailure(CheckinError::Config(e.to_string()))
        }
        Err(e) => return StepOutcome::TransientFailure(e.to_string()),
    };
    let status = response.status;

    if AUTH_CODES.contains(&i64::from(status)) {
        return StepOutcome::Unauthorized;
    }

    let body = match &response.body {
        Some(b) => b,
        None => {
            return StepOutcome::TransientFailure(format!("HTTP {status} with a non-JSON body"))
        }
    };

    let code = rules.app_code(body);
    if code.is_some_and(|c| AUTH_CODES.contains(&c)) {
        return StepOutcome::Unauthorized;
    }

    let already_done = rules
        .message(body)
        .is_some_and(|m| rules.is_already_done_message(m));

    if status == 500 && rules.already_done_on_server_error && already_done {
        return StepOutcome::AlreadyDone(body.clone());
    }

    let flag = rules.flag(body);
    if (200..300).contains(&status) {
        if already_done {
            return StepOutcome::AlreadyDone(body.clone());
        }
        let code_ok = code.is_some_and(|c| rules.success_codes.contains(&c));
        if flag == Some(true) || code_ok {
            return StepOutcome::Success(body.clone());
        }
        if rules.bare_success && flag.is_none() && code.is_none() {
            return StepOutcome::Success(body.clone());
        }
    }

    if (200..500).contains(&status) && (flag == Some(false) || code.is_some()) {
        return StepOutcome::FatalFailure(CheckinError::Business(rules.describe(body)));
    }

    StepOutcome::TransientFailure(format!("unclassifiable response: HTTP {status}"))
}

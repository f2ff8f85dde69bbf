use std::collections::BTreeMap;

use super::error::CheckinError;

/// Authentication material for one account on one service.
///
/// The field set is service-specific (`cookie`, `authorization`,
/// `cf_clearance`, `cred`, ...); the engine treats every value as opaque.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    label: String,
    secrets: BTreeMap<String, String>,
    fresh: bool,
}

impl Credential {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            secrets: BTreeMap::new(),
            fresh: true,
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }

    /// Like [`Credential::get`] but yields `""` for absent fields.
    pub fn value(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(key.into(), value.into());
    }

    pub fn is_fresh(&self) -> bool {
        self.fresh
    }

    /// Mark the credential as known-stale, e.g. a required cookie is missing.
    pub fn mark_stale(&mut self) {
        self.fresh = false;
    }

    pub fn mark_fresh(&mut self) {
        self.fresh = true;
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let keys: Vec<&String> = self.secrets.keys().collect();
        f.debug_struct("Credential")
            .field("label", &self.label)
            .field("fields", &keys)
            .field("fresh", &self.fresh)
            .finish_non_exhaustive()
    }
}

/// One identity on one service: a credential plus the service parameters
/// (signing salt, user agent, role id, ...) that never change during a run.
#[derive(Debug, Clone)]
pub struct Account {
    credential: Credential,
    params: BTreeMap<String, String>,
    refresh_attempted: bool,
}

impl Account {
    pub fn new(credential: Credential) -> Self {
        Self {
            credential,
            params: BTreeMap::new(),
            refresh_attempted: false,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn label(&self) -> &str {
        self.credential.label()
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Reset per-run bookkeeping at the start of a workflow.
    pub fn begin_run(&mut self) {
        self.refresh_attempted = false;
    }

    pub fn refresh_attempted(&self) -> bool {
        self.refresh_attempted
    }

    /// Record that the single refresh allowed this run has been used,
    /// whether or not it produced a credential.
    pub fn note_refresh_attempt(&mut self) {
        self.refresh_attempted = true;
    }

    pub fn replace_credential(&mut self, mut credential: Credential) {
        credential.mark_fresh();
        self.credential = credential;
    }
}

/// A labelled piece of data extracted from a step, shown in the report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultField {
    pub label: String,
    pub value: String,
}

/// Everything learned about one account during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountResult {
    pub label: String,
    pub success: bool,
    /// The side-effecting action was performed by this run, as opposed to
    /// having been found already done.
    pub performed: bool,
    pub message: String,
    pub fields: Vec<ResultField>,
    pub failure: Option<CheckinError>,
    /// Non-fatal problems, such as a failed optional step.
    pub notes: Vec<String>,
}

impl AccountResult {
    pub fn pending(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: false,
            performed: false,
            message: String::new(),
            fields: Vec::new(),
            failure: None,
            notes: Vec::new(),
        }
    }

    /// Add or overwrite a labelled field, keeping first-insertion order.
    pub fn set_field(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.fields.iter_mut().find(|f| f.label == label) {
            Some(existing) => existing.value = value,
            None => self.fields.push(ResultField { label, value }),
        }
    }

    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }

    pub(crate) fn abort(mut self, error: CheckinError) -> Self {
        self.success = false;
        self.message = error.to_string();
        self.failure = Some(error);
        self
    }

    pub(crate) fn finish(mut self, performed: bool) -> Self {
        self.success = true;
        self.performed = performed;
        self.message = if performed {
            "checked in successfully".to_string()
        } else {
            "already checked in today".to_string()
        };
        self
    }

    /// Result for an account that never started because the run was cancelled.
    pub fn skipped(label: impl Into<String>) -> Self {
        let mut result = Self::pending(label);
        result.message = "skipped: run cancelled before this account started".to_string();
        result
    }
}

/// Ordered per-account results of one service batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub service: String,
    pub results: Vec<AccountResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

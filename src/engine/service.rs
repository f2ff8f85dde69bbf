use std::collections::BTreeMap;

use serde_json::Value;

use super::account::{Account, AccountResult};
use super::classify::ClassifierRules;
use crate::transport::Request;

/// One logical request of a check-in workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// Ask whether today's action is already done.
    QueryState,
    /// Perform the side-effecting check-in.
    PerformAction,
    /// Read back points, streaks or rewards.
    QueryConfirmation,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::QueryState => "query-state",
            Step::PerformAction => "perform-action",
            Step::QueryConfirmation => "query-confirmation",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSpec {
    pub step: Step,
    /// A failed optional step is noted but neither aborts the workflow nor
    /// fails the account.
    pub required: bool,
}

impl StepSpec {
    pub const fn required(step: Step) -> Self {
        Self {
            step,
            required: true,
        }
    }

    pub const fn optional(step: Step) -> Self {
        Self {
            step,
            required: false,
        }
    }
}

pub const DEFAULT_STEPS: [StepSpec; 3] = [
    StepSpec::required(Step::QueryState),
    StepSpec::required(Step::PerformAction),
    StepSpec::required(Step::QueryConfirmation),
];

/// Payloads of the steps completed so far in one workflow run.
#[derive(Debug, Default)]
pub struct StepHistory {
    payloads: BTreeMap<Step, Value>,
}

impl StepHistory {
    pub fn get(&self, step: Step) -> Option<&Value> {
        self.payloads.get(&step)
    }

    pub(crate) fn record(&mut self, step: Step, payload: Value) {
        self.payloads.insert(step, payload);
    }
}

/// Adapter for one remote service: how to talk to it and how to read it.
pub trait Service: Send + Sync {
    fn name(&self) -> &str;

    /// Classification rules for the response to `step`.
    fn rules(&self, step: Step) -> &ClassifierRules;

    /// Ordered steps of the check-in workflow.
    fn steps(&self) -> &[StepSpec] {
        &DEFAULT_STEPS
    }

    /// Build the request for `step` from the account's current credential.
    fn build_request(&self, step: Step, account: &Account) -> Request;

    /// Whether a QueryState payload shows today's action as complete.
    fn reports_done(&self, _state: &Value) -> bool {
        false
    }

    /// Fold a completed step's payload into the account result.
    fn merge(
        &self,
        _step: Step,
        _payload: &Value,
        _history: &StepHistory,
        _result: &mut AccountResult,
    ) {
    }
}

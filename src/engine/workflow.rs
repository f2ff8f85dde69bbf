use super::account::{Account, AccountResult};
use super::executor::{StepExecutor, StepResult};
use super::service::{Service, Step, StepHistory};

/// Position of a workflow in its lifecycle. Done and Aborted are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Pending,
    Running(Step),
    Done,
    Aborted,
}

/// Runs one account's ordered check-in steps and builds its [`AccountResult`].
#[derive(Clone, Copy)]
pub struct WorkflowRunner<'a> {
    executor: StepExecutor<'a>,
}

impl<'a> WorkflowRunner<'a> {
    pub fn new(executor: StepExecutor<'a>) -> Self {
        Self { executor }
    }

    pub async fn run(&self, service: &dyn Service, account: &mut Account) -> AccountResult {
        account.begin_run();
        let mut result = AccountResult::pending(account.label());
        let mut state = WorkflowState::Pending;

        if !account.credential().is_fresh() {
            tracing::info!(
                account = %account.label(),
                "Credential marked stale, refreshing before the first request"
            );
            if let Err(e) = self.executor.refresh(account).await {
                transition(account, &mut state, WorkflowState::Aborted);
                return result.abort(e);
            }
        }

        let mut history = StepHistory::default();
        let mut already_done = false;
        let mut performed = false;

        for spec in service.steps() {
            let step = spec.step;
            if step == Step::PerformAction && already_done {
                tracing::info!(
                    account = %account.label(),
                    "Already checked in today, skipping {}",
                    step.as_str()
                );
                continue;
            }
            transition(account, &mut state, WorkflowState::Running(step));

            let outcome = self
                .executor
                .execute(account, service.rules(step), |acct| {
                    service.build_request(step, acct)
                })
                .await;

            let payload = match outcome {
                StepResult::Success(payload) => {
                    match step {
                        Step::PerformAction => performed = true,
                        Step::QueryState if service.reports_done(&payload) => already_done = true,
                        _ => {}
                    }
                    payload
                }
                StepResult::AlreadyDone(payload) => {
                    if step != Step::QueryConfirmation {
                        already_done = true;
                    }
                    payload
                }
                StepResult::Failed(e) if spec.required => {
                    tracing::warn!(
                        account = %account.label(),
                        "Step {} failed: {}",
                        step.as_str(),
                        e
                    );
                    transition(account, &mut state, WorkflowState::Aborted);
                    return result.abort(e);
                }
                StepResult::Failed(e) => {
                    tracing::warn!(
                        account = %account.label(),
                        "Optional step {} failed, continuing: {}",
                        step.as_str(),
                        e
                    );
                    result.notes.push(format!("{} failed: {}", step.as_str(), e));
                    continue;
                }
            };

            service.merge(step, &payload, &history, &mut result);
            history.record(step, payload);
        }

        transition(account, &mut state, WorkflowState::Done);
        result.finish(performed)
    }
}

fn transition(account: &Account, state: &mut WorkflowState, next: WorkflowState) {
    tracing::debug!(account = %account.label(), "workflow {:?} -> {:?}", state, next);
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{
        stale_account, test_account, MockReply, MockTransport, ScriptedRefresher, TestService,
    };
    use crate::engine::error::ErrorKind;
    use crate::retry::RetryConfig;
    use serde_json::json;
    use std::time::Duration;

    fn retry() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_all_steps_succeed_one_request_each() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::ok(json!({"done": false})))
            .always("tok-a action", MockReply::ok(json!({"gain": 5})))
            .always("tok-a confirm", MockReply::ok(json!({"points": 42})));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(result.success);
        assert!(result.performed);
        assert_eq!(result.message, "checked in successfully");
        assert_eq!(result.field("Gain"), Some("5"));
        assert_eq!(result.field("Points"), Some("42"));
        assert_eq!(transport.request_count(), 3);
        assert_eq!(
            transport.requested_paths(),
            vec!["state", "action", "confirm"]
        );
    }

    #[tokio::test]
    async fn test_state_done_skips_action_on_every_run() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::ok(json!({"done": true})))
            .always("tok-a action", MockReply::ok(json!({"gain": 5})))
            .always("tok-a confirm", MockReply::ok(json!({"points": 42})));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");
        let service = TestService::default();

        let first = runner.run(&service, &mut account).await;
        assert!(first.success);
        assert!(!first.performed);
        assert_eq!(first.message, "already checked in today");
        assert_eq!(first.field("Gain"), None);

        let before = transport.request_count();
        let second = runner.run(&service, &mut account).await;
        assert!(second.success);
        assert_eq!(transport.request_count() - before, 2);
        assert!(!transport.requested_paths().contains(&"action".to_string()));
    }

    #[tokio::test]
    async fn test_fatal_step_aborts_and_leaves_later_fields_unset() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::ok(json!({"done": false})))
            .always(
                "tok-a action",
                MockReply::json(200, json!({"code": 10002, "message": "sign invalid"})),
            )
            .always("tok-a confirm", MockReply::ok(json!({"points": 42})));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(!result.success);
        assert!(result.message.contains("sign invalid"));
        assert_eq!(result.field("Points"), None);
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_abort_workflow() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::NetworkDown)
            .always("tok-a action", MockReply::ok(json!({})));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(!result.success);
        assert_eq!(
            result.failure.as_ref().map(|e| e.kind()),
            Some(ErrorKind::Network)
        );
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn test_action_already_done_is_success_not_performed() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::ok(json!({"done": false})))
            .always(
                "tok-a action",
                MockReply::json(200, json!({"code": 1, "message": "already signed"})),
            )
            .always("tok-a confirm", MockReply::ok(json!({"points": 1})));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(result.success);
        assert!(!result.performed);
        assert_eq!(result.field("Points"), Some("1"));
    }

    #[tokio::test]
    async fn test_optional_step_failure_keeps_success() {
        let transport = MockTransport::new()
            .always("tok-a state", MockReply::ok(json!({"done": false})))
            .always("tok-a action", MockReply::ok(json!({"gain": 1})))
            .always("tok-a confirm", MockReply::status(401));
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));
        let mut account = test_account("a", "tok-a");
        let service = TestService::with_optional_confirmation();

        let result = runner.run(&service, &mut account).await;
        assert!(result.success);
        assert_eq!(result.notes.len(), 1);
        assert!(result.notes[0].contains("query-confirmation"));
    }

    #[tokio::test]
    async fn test_stale_credential_refreshed_before_first_step() {
        let transport = MockTransport::new()
            .always("tok-new state", MockReply::ok(json!({"done": true})))
            .always("tok-new confirm", MockReply::ok(json!({"points": 3})));
        let refresher = ScriptedRefresher::succeeding("tok-new");
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, Some(&refresher), &retry));
        let mut account = stale_account("a");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(result.success);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(account.credential().value("token"), "tok-new");
    }

    #[tokio::test]
    async fn test_stale_credential_without_refresher_fails_without_requests() {
        let mut account = stale_account("a");
        let transport = MockTransport::new();
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, None, &retry));

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(!result.success);
        assert_eq!(
            result.failure.as_ref().map(|e| e.kind()),
            Some(ErrorKind::Refresh)
        );
        assert_eq!(transport.request_count(), 0);
    }

    #[tokio::test]
    async fn test_refresh_spent_in_one_step_not_repeated_in_next() {
        let transport = MockTransport::new()
            .always("tok-old state", MockReply::status(401))
            .always("tok-new state", MockReply::ok(json!({"done": false})))
            .always("tok-new action", MockReply::status(401));
        let refresher = ScriptedRefresher::succeeding("tok-new");
        let retry = retry();
        let runner = WorkflowRunner::new(StepExecutor::new(&transport, Some(&refresher), &retry));
        let mut account = test_account("a", "tok-old");

        let result = runner.run(&TestService::default(), &mut account).await;
        assert!(!result.success);
        assert_eq!(refresher.calls(), 1);
        assert_eq!(transport.request_count(), 3);
    }
}

use serde_json::Value;

use super::account::Account;
use super::classify::{classify, ClassifierRules, StepOutcome};
use super::error::CheckinError;
use crate::refresh::{CredentialRefresher, RefreshOutcome};
use crate::retry::RetryConfig;
use crate::transport::{Request, Transport};

/// Terminal result of one resilient request. Unauthorized and transient
/// outcomes never escape the executor.
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Success(Value),
    AlreadyDone(Value),
    Failed(CheckinError),
}

/// Sends one logical request, retrying transient failures with a fixed delay
/// and spending the account's single credential refresh on an Unauthorized.
#[derive(Clone, Copy)]
pub struct StepExecutor<'a> {
    transport: &'a dyn Transport,
    refresher: Option<&'a dyn CredentialRefresher>,
    retry: &'a RetryConfig,
}

impl<'a> StepExecutor<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        refresher: Option<&'a dyn CredentialRefresher>,
        retry: &'a RetryConfig,
    ) -> Self {
        Self {
            transport,
            refresher,
            retry,
        }
    }

    /// Execute the request produced by `build`.
    ///
    /// `build` is called before every send so that a refreshed credential is
    /// picked up by the re-sent request.
    pub async fn execute<F>(
        &self,
        account: &mut Account,
        rules: &ClassifierRules,
        build: F,
    ) -> StepResult
    where
        F: Fn(&Account) -> Request,
    {
        let max_attempts = self.retry.effective_attempts();
        let mut transient_failures = 0u32;

        loop {
            let request = build(account);
            let sent = self.transport.send(&request).await;
            let outcome = classify(rules, sent.as_ref());
            tracing::debug!(
                account = %account.label(),
                "{} {} -> {:?}",
                request.method.as_str(),
                request.url,
                OutcomeTag(&outcome)
            );

            match outcome {
                StepOutcome::Success(body) => return StepResult::Success(body),
                StepOutcome::AlreadyDone(body) => return StepResult::AlreadyDone(body),
                StepOutcome::FatalFailure(e) => return StepResult::Failed(e),
                StepOutcome::Unauthorized => {
                    if account.refresh_attempted() {
                        return StepResult::Failed(CheckinError::Auth(
                            "rejected again after credential refresh".to_string(),
                        ));
                    }
                    if self.refresher.is_none() {
                        return StepResult::Failed(CheckinError::Auth(
                            "rejected by service, no credential refresher configured".to_string(),
                        ));
                    }
                    if let Err(e) = self.refresh(account).await {
                        return StepResult::Failed(e);
                    }
                    tracing::info!(
                        account = %account.label(),
                        "Credential refreshed, re-sending request"
                    );
                }
                StepOutcome::TransientFailure(cause) => {
                    transient_failures += 1;
                    if transient_failures >= max_attempts {
                        return StepResult::Failed(CheckinError::Network {
                            attempts: transient_failures,
                            cause,
                        });
                    }
                    tracing::warn!(
                        account = %account.label(),
                        "Transient failure (attempt {}/{}), retrying in {}ms: {}",
                        transient_failures,
                        max_attempts,
                        self.retry.delay.as_millis(),
                        cause
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    /// Spend the account's one refresh for this run.
    ///
    /// On success the account's credential is replaced in place.
    pub async fn refresh(&self, account: &mut Account) -> Result<(), CheckinError> {
        if account.refresh_attempted() {
            return Err(CheckinError::Refresh(
                "refresh already used for this run".to_string(),
            ));
        }
        account.note_refresh_attempt();

        let refresher = self.refresher.ok_or_else(|| {
            CheckinError::Refresh("no credential refresher configured".to_string())
        })?;

        match refresher.refresh(account).await {
            RefreshOutcome::Refreshed(credential) => {
                account.replace_credential(credential);
                Ok(())
            }
            RefreshOutcome::Unavailable(reason) | RefreshOutcome::Failed(reason) => {
                tracing::warn!(account = %account.label(), "Credential refresh failed: {}", reason);
                Err(CheckinError::Refresh(reason))
            }
        }
    }
}

/// Logs an outcome by variant without dumping response bodies.
struct OutcomeTag<'o>(&'o StepOutcome);

impl std::fmt::Debug for OutcomeTag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            StepOutcome::Success(_) => f.write_str("Success"),
            StepOutcome::AlreadyDone(_) => f.write_str("AlreadyDone"),
            StepOutcome::Unauthorized => f.write_str("Unauthorized"),
            StepOutcome::TransientFailure(cause) => write!(f, "TransientFailure({cause})"),
            StepOutcome::FatalFailure(e) => write!(f, "FatalFailure({e})"),
        }
    }
}

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt as _;
use tokio_util::sync::CancellationToken;

use super::account::{Account, AccountResult, BatchReport};
use super::error::CheckinError;
use super::service::Service;
use super::workflow::WorkflowRunner;
use crate::retry::PacingConfig;

/// Runs every account of one service strictly in configuration order.
///
/// Accounts never run concurrently: the pause between them is what keeps the
/// remote side from throttling the run.
pub struct BatchOrchestrator<'a> {
    runner: WorkflowRunner<'a>,
    pacing: PacingConfig,
    cancel: CancellationToken,
}

impl<'a> BatchOrchestrator<'a> {
    pub fn new(
        runner: WorkflowRunner<'a>,
        pacing: PacingConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            runner,
            pacing,
            cancel,
        }
    }

    /// Produce one [`AccountResult`] per account, in order.
    ///
    /// Zero accounts is a configuration error and sends no request. Once the
    /// cancellation token fires, the in-flight account finishes and every
    /// account not yet started is recorded as skipped.
    pub async fn run(
        &self,
        service: &dyn Service,
        accounts: &mut [Account],
    ) -> Result<BatchReport, CheckinError> {
        if accounts.is_empty() {
            return Err(CheckinError::Config(format!(
                "no usable {} accounts configured",
                service.name()
            )));
        }

        let total = accounts.len();
        let mut results = Vec::with_capacity(total);
        tracing::info!("{}: processing {} account(s)", service.name(), total);

        for (index, account) in accounts.iter_mut().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(account = %account.label(), "Run cancelled, skipping account");
                results.push(AccountResult::skipped(account.label()));
                continue;
            }

            tracing::info!(
                account = %account.label(),
                "Starting account {}/{}",
                index + 1,
                total
            );
            let label = account.label().to_string();
            let result = match AssertUnwindSafe(self.runner.run(service, account))
                .catch_unwind()
                .await
            {
                Ok(result) => result,
                Err(payload) => {
                    let reason = panic_reason(payload.as_ref());
                    AccountResult::pending(label)
                        .abort(CheckinError::Internal(format!("workflow panicked: {reason}")))
                }
            };

            match result.failure.as_ref().map(CheckinError::kind) {
                None => tracing::info!(account = %result.label, "{}", result.message),
                Some(kind) if kind.is_local() => {
                    tracing::error!(account = %result.label, "{}", result.message)
                }
                Some(_) => tracing::warn!(account = %result.label, "{}", result.message),
            }
            results.push(result);

            if index + 1 < total {
                let delay = self.pacing.next_delay();
                tracing::debug!("Pausing {}ms before the next account", delay.as_millis());
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {}
                }
            }
        }

        Ok(BatchReport {
            service: service.name().to_string(),
            results,
        })
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown cause"
    }
}

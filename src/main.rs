//! checkin-rs: daily check-ins for cookie/token authenticated web services.
//!
//! Accounts of each selected service run strictly one after another. Each
//! request is classified per service, transient failures are retried with a
//! fixed delay, and an expired credential gets one refresh per run. Every
//! account ends up as exactly one line of the delivered report.

#![warn(clippy::all)]

mod cli;
mod config;
mod engine;
mod notify;
mod refresh;
mod report;
pub mod retry;
mod services;
mod shutdown;
mod transport;
mod types;

use std::time::Instant;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use engine::{BatchOrchestrator, StepExecutor, WorkflowRunner};
use notify::{ConsoleNotifier, Notifier, WebhookNotifier};
use transport::HttpTransport;

/// Exit code when no service has a single usable account.
const EXIT_NO_ACCOUNTS: i32 = 2;
/// Exit code for `--strict` runs with at least one failed account.
const EXIT_ACCOUNT_FAILED: i32 = 1;

fn build_notifiers(config: &config::Config) -> anyhow::Result<Vec<Box<dyn Notifier>>> {
    let mut notifiers: Vec<Box<dyn Notifier>> = vec![Box::new(ConsoleNotifier)];
    if let Some(url) = &config.notify_url {
        notifiers.push(Box::new(WebhookNotifier::new(url.clone(), config.timeout)?));
    }
    Ok(notifiers)
}

/// Run every selected service and return the process exit code.
async fn run(config: &config::Config) -> anyhow::Result<i32> {
    let plans = services::build_plans(config);
    let total_accounts: usize = plans.iter().map(|p| p.accounts.len()).sum();
    if total_accounts == 0 {
        tracing::error!(
            "No usable accounts configured; set e.g. NODESEEK_COOKIE, ACCK_ACCOUNTS, \
             SVYUN_ACCOUNTS or SKLAND_ENDFIELD_ACCOUNTS"
        );
        return Ok(EXIT_NO_ACCOUNTS);
    }

    let transport = HttpTransport::new(config.timeout)?;
    let notifiers = build_notifiers(config)?;
    let shutdown_token = shutdown::install_signal_handler()?;
    if let Some(deadline) = config.deadline {
        shutdown::arm_deadline(&shutdown_token, deadline);
    }

    tracing::info!(
        services = plans.len(),
        accounts = total_accounts,
        "Starting check-in run"
    );

    let mut any_failed = false;
    for mut plan in plans {
        let started = Instant::now();
        let executor = StepExecutor::new(&transport, plan.refresher.as_deref(), &config.retry);
        let orchestrator = BatchOrchestrator::new(
            WorkflowRunner::new(executor),
            config.pacing.clone(),
            shutdown_token.clone(),
        );

        let report = match orchestrator
            .run(plan.service.as_ref(), &mut plan.accounts)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "{}: {}", plan.kind.display_name(), e);
                any_failed = true;
                continue;
            }
        };

        tracing::info!(
            succeeded = report.succeeded(),
            total = report.len(),
            elapsed_secs = started.elapsed().as_secs(),
            "{} check-in finished",
            report.service
        );
        any_failed |= !report.all_succeeded();

        let title = report::title(&report);
        let body = report::render(&report, chrono::Local::now().naive_local());
        notify::deliver_all(&notifiers, &title, &body).await;
    }

    if config.strict && any_failed {
        return Ok(EXIT_ACCOUNT_FAILED);
    }
    Ok(0)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_filter())),
        )
        .init();

    let config = config::Config::from_cli(cli)?;
    tracing::debug!(?config, "Configuration loaded");

    let code = run(&config).await?;
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

//! Credential re-acquisition.
//!
//! Obtaining a replacement credential (for example a fresh `cf_clearance`
//! cookie from a headless browser) is delegated to an external program. The
//! program receives the account label in `CHECKIN_ACCOUNT_LABEL` and must
//! print the new secret value on stdout.

use std::time::Duration;

use tokio::process::Command;

use crate::engine::{Account, Credential};

/// Result of asking for a new credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Refreshed(Credential),
    /// The mechanism is not usable in this environment.
    Unavailable(String),
    Failed(String),
}

#[async_trait::async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self, account: &Account) -> RefreshOutcome;
}

/// Runs a shell command and stores its trimmed stdout into one credential field.
#[derive(Debug, Clone)]
pub struct CommandRefresher {
    command: String,
    field: String,
    timeout: Duration,
}

impl CommandRefresher {
    pub fn new(command: impl Into<String>, field: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            field: field.into(),
            timeout,
        }
    }

    fn shell(&self) -> Command {
        #[cfg(unix)]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(&self.command);
            cmd
        }
        #[cfg(not(unix))]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(&self.command);
            cmd
        }
    }
}

#[async_trait::async_trait]
impl CredentialRefresher for CommandRefresher {
    async fn refresh(&self, account: &Account) -> RefreshOutcome {
        let mut cmd = self.shell();
        cmd.env("CHECKIN_ACCOUNT_LABEL", account.label())
            .stdin(std::process::Stdio::null())
            .kill_on_drop(true);

        tracing::info!(account = %account.label(), "Running credential refresh command");
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Err(_) => {
                return RefreshOutcome::Failed(format!(
                    "refresh command timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                return RefreshOutcome::Unavailable(format!("refresh command not runnable: {e}"))
            }
            Ok(Err(e)) => return RefreshOutcome::Failed(format!("refresh command error: {e}")),
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return RefreshOutcome::Failed(format!(
                "refresh command exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let value = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if value.is_empty() {
            return RefreshOutcome::Failed("refresh command printed nothing".to_string());
        }

        let mut credential = account.credential().clone();
        credential.set(self.field.clone(), value);
        RefreshOutcome::Refreshed(credential)
    }
}

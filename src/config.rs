use std::time::Duration;

use crate::cli::{AccountArgs, Cli};
use crate::retry::{PacingConfig, RetryConfig};
use crate::services::attendance::parse_custom_headers;
use crate::types::{ServiceKind, SignType};

/// Where a service's accounts come from.
pub enum AccountSource {
    /// Entries separated by newlines or `&`, fields within an entry by `#`.
    List(String),
    /// One account given field by field, in entry order. Values are kept
    /// verbatim, so they may contain `#`, `&` or newlines.
    Single(Vec<String>),
}

impl AccountSource {
    fn list(raw: Option<String>) -> Option<Self> {
        non_empty(raw).map(AccountSource::List)
    }
}

/// NodeSeek / DeepFlood settings.
#[derive(Default)]
pub struct AttendanceSettings {
    pub accounts: Option<AccountSource>,
    pub user_agent: Option<String>,
    pub sign_type: SignType,
    pub extra_headers: Vec<(String, String)>,
}

#[derive(Default)]
pub struct AcckSettings {
    pub accounts: Option<AccountSource>,
    pub refresh_command: Option<String>,
}

#[derive(Default)]
pub struct SvyunSettings {
    pub accounts: Option<AccountSource>,
    pub user_agent: Option<String>,
}

#[derive(Default)]
pub struct SklandSettings {
    pub accounts: Option<AccountSource>,
    pub timestamp: Option<String>,
}

/// Application configuration, built once from the CLI and environment and
/// passed by reference. Nothing below `main` reads the environment.
pub struct Config {
    /// Explicit `--service` selection; empty means "every configured service".
    pub services: Vec<ServiceKind>,
    pub notify_url: Option<String>,

    pub nodeseek: AttendanceSettings,
    pub deepflood: AttendanceSettings,
    pub acck: AcckSettings,
    pub svyun: SvyunSettings,
    pub skland: SklandSettings,

    pub retry: RetryConfig,
    pub pacing: PacingConfig,
    pub timeout: Duration,
    pub deadline: Option<Duration>,

    pub strict: bool,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let configured: Vec<ServiceKind> = ServiceKind::ALL
            .into_iter()
            .filter(|k| self.has_accounts(*k))
            .collect();
        f.debug_struct("Config")
            .field("services", &self.services)
            .field("configured", &configured)
            .field("retry", &self.retry)
            .field("pacing", &self.pacing)
            .field("timeout", &self.timeout)
            .field("deadline", &self.deadline)
            .field("notify_url", &self.notify_url.as_ref().map(|_| "<set>"))
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}

/// Remark given to an account configured through the single-account variables.
const DEFAULT_REMARK: &str = "Default account";

/// Trimmed, non-empty value or `None`.
fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_cli(cli: Cli) -> anyhow::Result<Self> {
        if cli.timeout_secs == 0 {
            anyhow::bail!("--timeout-secs must be greater than zero");
        }
        if cli.pace_min_ms > cli.pace_max_ms {
            anyhow::bail!(
                "--pace-min-ms ({}) must not exceed --pace-max-ms ({})",
                cli.pace_min_ms,
                cli.pace_max_ms
            );
        }

        let notify_url = non_empty(cli.notify_url);
        if let Some(raw) = &notify_url {
            let parsed = url::Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("Invalid --notify-url '{}': {}", raw, e))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                anyhow::bail!("--notify-url must be an http(s) URL, got '{}'", raw);
            }
        }

        let AccountArgs {
            nodeseek_cookie,
            nodeseek_user_agent,
            nodeseek_sign_type,
            deepflood_cookie,
            deepflood_user_agent,
            deepflood_sign_type,
            deepflood_headers,
            acck_accounts,
            acck_authorization,
            acck_cf_clearance,
            acck_refresh_command,
            svyun_accounts,
            svyun_token,
            svyun_cookie,
            svyun_remark,
            svyun_user_agent,
            skland_accounts,
            skland_cred,
            skland_did,
            skland_role,
            skland_user_agent,
            skland_vname,
            skland_platform,
            skland_sign_salt,
            skland_sign,
            skland_remark,
            skland_timestamp,
        } = cli.accounts;

        let acck_accounts = AccountSource::list(acck_accounts).or_else(|| {
            non_empty(acck_authorization).map(|jwt| {
                AccountSource::Single(vec![
                    jwt,
                    non_empty(acck_cf_clearance).unwrap_or_default(),
                    DEFAULT_REMARK.to_string(),
                ])
            })
        });

        let svyun_accounts = AccountSource::list(svyun_accounts).or_else(|| {
            non_empty(svyun_token).map(|token| {
                AccountSource::Single(vec![
                    token,
                    non_empty(svyun_cookie).unwrap_or_default(),
                    non_empty(svyun_remark).unwrap_or_else(|| DEFAULT_REMARK.to_string()),
                ])
            })
        });

        let skland_accounts = AccountSource::list(skland_accounts).or_else(|| {
            non_empty(skland_cred).map(|cred| {
                AccountSource::Single(
                    [
                        Some(cred),
                        non_empty(skland_did),
                        non_empty(skland_role),
                        non_empty(skland_user_agent),
                        non_empty(skland_vname),
                        non_empty(skland_platform),
                        non_empty(skland_sign_salt),
                        non_empty(skland_sign),
                        non_empty(skland_remark).or_else(|| Some(DEFAULT_REMARK.to_string())),
                    ]
                    .into_iter()
                    .map(Option::unwrap_or_default)
                    .collect(),
                )
            })
        });

        Ok(Self {
            services: cli.services,
            notify_url,
            nodeseek: AttendanceSettings {
                accounts: AccountSource::list(nodeseek_cookie),
                user_agent: non_empty(nodeseek_user_agent),
                sign_type: nodeseek_sign_type,
                extra_headers: Vec::new(),
            },
            deepflood: AttendanceSettings {
                accounts: AccountSource::list(deepflood_cookie),
                user_agent: non_empty(deepflood_user_agent),
                sign_type: deepflood_sign_type,
                extra_headers: non_empty(deepflood_headers)
                    .map(|raw| parse_custom_headers(&raw))
                    .unwrap_or_default(),
            },
            acck: AcckSettings {
                accounts: acck_accounts,
                refresh_command: non_empty(acck_refresh_command),
            },
            svyun: SvyunSettings {
                accounts: svyun_accounts,
                user_agent: non_empty(svyun_user_agent),
            },
            skland: SklandSettings {
                accounts: skland_accounts,
                timestamp: non_empty(skland_timestamp),
            },
            retry: RetryConfig {
                max_attempts: cli.max_attempts,
                delay: Duration::from_millis(cli.retry_delay_ms),
            },
            pacing: PacingConfig {
                min_ms: cli.pace_min_ms,
                max_ms: cli.pace_max_ms,
            },
            timeout: Duration::from_secs(cli.timeout_secs),
            deadline: cli.deadline_secs.map(Duration::from_secs),
            strict: cli.strict,
        })
    }

    pub fn accounts(&self, kind: ServiceKind) -> Option<&AccountSource> {
        match kind {
            ServiceKind::Nodeseek => self.nodeseek.accounts.as_ref(),
            ServiceKind::Deepflood => self.deepflood.accounts.as_ref(),
            ServiceKind::Acck => self.acck.accounts.as_ref(),
            ServiceKind::Svyun => self.svyun.accounts.as_ref(),
            ServiceKind::SklandEndfield => self.skland.accounts.as_ref(),
        }
    }

    pub fn has_accounts(&self, kind: ServiceKind) -> bool {
        self.accounts(kind).is_some()
    }
}

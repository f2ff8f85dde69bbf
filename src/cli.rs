use clap::Parser;

use crate::types::{LogLevel, ServiceKind, SignType};

fn parse_sign_type(s: &str) -> Result<SignType, std::convert::Infallible> {
    Ok(SignType::parse_lenient(s))
}

#[derive(Parser)]
#[command(
    name = "checkin-rs",
    version,
    about = "Run daily check-ins for every configured account"
)]
pub struct Cli {
    /// Service(s) to run (default: every service with accounts configured)
    #[arg(long = "service", value_enum)]
    pub services: Vec<ServiceKind>,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Attempts per request on transient failures, including the first
    #[arg(long, default_value_t = 3)]
    pub max_attempts: u32,

    /// Fixed delay between attempts, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub retry_delay_ms: u64,

    /// Minimum pause between two accounts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub pace_min_ms: u64,

    /// Maximum pause between two accounts, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub pace_max_ms: u64,

    /// HTTP timeout for requests without a service-specific timeout
    #[arg(long, default_value_t = 15)]
    pub timeout_secs: u64,

    /// Stop starting new accounts after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,

    /// Webhook receiving `{"title", "content"}` JSON reports
    #[arg(long, env = "CHECKIN_NOTIFY_URL")]
    pub notify_url: Option<String>,

    /// Exit non-zero when any account fails
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub accounts: AccountArgs,
}

/// Per-service account configuration, normally supplied via the environment.
#[derive(clap::Args, Default)]
pub struct AccountArgs {
    /// NodeSeek cookies, one account per entry
    #[arg(long, env = "NODESEEK_COOKIE", hide_env_values = true)]
    pub nodeseek_cookie: Option<String>,

    #[arg(long, env = "NODESEEK_USER_AGENT")]
    pub nodeseek_user_agent: Option<String>,

    /// `fixed` or `random` attendance
    #[arg(
        long,
        env = "NODESEEK_SIGN_TYPE",
        value_parser = parse_sign_type,
        default_value = "fixed"
    )]
    pub nodeseek_sign_type: SignType,

    /// DeepFlood cookies, one account per entry
    #[arg(long, env = "DEEPFLOOD_COOKIE", hide_env_values = true)]
    pub deepflood_cookie: Option<String>,

    #[arg(long, env = "DEEPFLOOD_USER_AGENT")]
    pub deepflood_user_agent: Option<String>,

    #[arg(
        long,
        env = "DEEPFLOOD_SIGN_TYPE",
        value_parser = parse_sign_type,
        default_value = "fixed"
    )]
    pub deepflood_sign_type: SignType,

    /// JSON object of extra request headers
    #[arg(long, env = "DEEPFLOOD_HEADERS")]
    pub deepflood_headers: Option<String>,

    /// `AUTHORIZATION#CF_CLEARANCE#remark` entries
    #[arg(long, env = "ACCK_ACCOUNTS", hide_env_values = true)]
    pub acck_accounts: Option<String>,

    #[arg(long, env = "ACCK_AUTHORIZATION", hide_env_values = true)]
    pub acck_authorization: Option<String>,

    #[arg(long, env = "ACCK_CF_CLEARANCE", hide_env_values = true)]
    pub acck_cf_clearance: Option<String>,

    /// Command printing a fresh cf_clearance on stdout
    #[arg(long, env = "ACCK_REFRESH_COMMAND")]
    pub acck_refresh_command: Option<String>,

    /// `TOKEN#COOKIE#remark` entries
    #[arg(long, env = "SVYUN_ACCOUNTS", hide_env_values = true)]
    pub svyun_accounts: Option<String>,

    #[arg(long, env = "SVYUN_TOKEN", hide_env_values = true)]
    pub svyun_token: Option<String>,

    #[arg(long, env = "SVYUN_COOKIE", hide_env_values = true)]
    pub svyun_cookie: Option<String>,

    #[arg(long, env = "SVYUN_REMARK")]
    pub svyun_remark: Option<String>,

    #[arg(long, env = "SVYUN_USER_AGENT")]
    pub svyun_user_agent: Option<String>,

    /// `CRED#DID#ROLE#USER_AGENT#VNAME#PLATFORM#SIGN_SALT#SIGN#remark` entries
    #[arg(long, env = "SKLAND_ENDFIELD_ACCOUNTS", hide_env_values = true)]
    pub skland_accounts: Option<String>,

    #[arg(long, env = "SKLAND_CRED", hide_env_values = true)]
    pub skland_cred: Option<String>,

    #[arg(long, env = "SKLAND_DID")]
    pub skland_did: Option<String>,

    #[arg(long, env = "SKLAND_ROLE")]
    pub skland_role: Option<String>,

    #[arg(long, env = "SKLAND_USER_AGENT")]
    pub skland_user_agent: Option<String>,

    #[arg(long, env = "SKLAND_VNAME")]
    pub skland_vname: Option<String>,

    #[arg(long, env = "SKLAND_PLATFORM")]
    pub skland_platform: Option<String>,

    #[arg(long, env = "SKLAND_SIGN_SALT", hide_env_values = true)]
    pub skland_sign_salt: Option<String>,

    #[arg(long, env = "SKLAND_SIGN", hide_env_values = true)]
    pub skland_sign: Option<String>,

    #[arg(long, env = "SKLAND_REMARK")]
    pub skland_remark: Option<String>,

    /// Pin the signed `timestamp` header instead of using the current time
    #[arg(long, env = "SKLAND_TIMESTAMP")]
    pub skland_timestamp: Option<String>,
}

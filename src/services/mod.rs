//! Concrete check-in services and the registry that wires them to accounts.

pub mod acck;
pub mod attendance;
pub mod skland;
pub mod svyun;

use std::time::Duration;

use serde_json::Value;

use crate::config::{AccountSource, Config};
use crate::engine::{Account, Service};
use crate::refresh::{CommandRefresher, CredentialRefresher};
use crate::types::ServiceKind;

/// Upper bound for one run of an external refresh command.
const REFRESH_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Split a multi-account value on newlines and `&`, dropping blank entries.
pub(crate) fn split_entries(raw: &str) -> Vec<&str> {
    raw.split(['\n', '&'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Split one `A#B#C` entry into trimmed fields; missing fields read as "".
pub(crate) fn split_fields<const N: usize>(entry: &str) -> [&str; N] {
    let mut fields = [""; N];
    for (slot, part) in fields.iter_mut().zip(entry.split('#')) {
        *slot = part.trim();
    }
    fields
}

/// Field arrays of every configured entry, in order.
///
/// A single-account source is taken as one entry whose values are never split.
pub(crate) fn entries<const N: usize>(source: &AccountSource) -> Vec<[&str; N]> {
    match source {
        AccountSource::List(raw) => split_entries(raw)
            .into_iter()
            .map(split_fields::<N>)
            .collect(),
        AccountSource::Single(values) => {
            let mut fields = [""; N];
            for (slot, value) in fields.iter_mut().zip(values) {
                *slot = value.as_str();
            }
            vec![fields]
        }
    }
}

#[cfg(test)]
pub(crate) fn listed(raw: &str) -> AccountSource {
    AccountSource::List(raw.to_string())
}

/// Label from an optional remark, falling back to the account's position.
pub(crate) fn label_or_position(remark: &str, position: usize) -> String {
    if remark.is_empty() {
        format!("Account {position}")
    } else {
        remark.to_string()
    }
}

/// Render a JSON scalar for a report line: strings without their quotes.
pub(crate) fn plain_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Everything needed to run one service's batch.
pub struct ServicePlan {
    pub kind: ServiceKind,
    pub service: Box<dyn Service>,
    pub accounts: Vec<Account>,
    pub refresher: Option<Box<dyn CredentialRefresher>>,
}

impl std::fmt::Debug for ServicePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServicePlan")
            .field("kind", &self.kind)
            .field("accounts", &self.accounts.len())
            .field("refresher", &self.refresher.is_some())
            .finish()
    }
}

/// Build one plan per selected service, in [`ServiceKind::ALL`] order.
///
/// With no explicit selection, every service that has account configuration
/// is selected. An explicitly selected service without accounts still gets a
/// plan so the caller can report it.
pub fn build_plans(config: &Config) -> Vec<ServicePlan> {
    ServiceKind::ALL
        .iter()
        .copied()
        .filter(|kind| {
            if config.services.is_empty() {
                config.has_accounts(*kind)
            } else {
                config.services.contains(kind)
            }
        })
        .map(|kind| build_plan(kind, config))
        .collect()
}

fn build_plan(kind: ServiceKind, config: &Config) -> ServicePlan {
    let empty = AccountSource::List(String::new());
    let source = config.accounts(kind).unwrap_or(&empty);
    match kind {
        ServiceKind::Nodeseek => ServicePlan {
            kind,
            service: Box::new(attendance::AttendanceService::new(
                &attendance::NODESEEK,
                config.nodeseek.sign_type,
                config.nodeseek.user_agent.clone(),
                config.nodeseek.extra_headers.clone(),
            )),
            accounts: attendance::parse_accounts(source),
            refresher: None,
        },
        ServiceKind::Deepflood => ServicePlan {
            kind,
            service: Box::new(attendance::AttendanceService::new(
                &attendance::DEEPFLOOD,
                config.deepflood.sign_type,
                config.deepflood.user_agent.clone(),
                config.deepflood.extra_headers.clone(),
            )),
            accounts: attendance::parse_accounts(source),
            refresher: None,
        },
        ServiceKind::Acck => {
            let refresher = config.acck.refresh_command.as_ref().map(|command| {
                Box::new(CommandRefresher::new(
                    command.clone(),
                    acck::CF_CLEARANCE,
                    REFRESH_COMMAND_TIMEOUT,
                )) as Box<dyn CredentialRefresher>
            });
            ServicePlan {
                kind,
                service: Box::new(acck::AcckService),
                accounts: acck::parse_accounts(source, refresher.is_some()),
                refresher,
            }
        }
        ServiceKind::Svyun => ServicePlan {
            kind,
            service: Box::new(svyun::SvyunService::new(config.svyun.user_agent.clone())),
            accounts: svyun::parse_accounts(source),
            refresher: None,
        },
        ServiceKind::SklandEndfield => ServicePlan {
            kind,
            service: Box::new(skland::SklandService::new(config.skland.timestamp.clone())),
            accounts: skland::parse_accounts(source),
            refresher: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_entries() {
        assert_eq!(split_entries("a\nb&c"), vec!["a", "b", "c"]);
        assert_eq!(split_entries("  a  \n\n&&  "), vec!["a"]);
        assert!(split_entries("").is_empty());
    }

    #[test]
    fn test_split_fields_pads_missing() {
        let [a, b, c] = split_fields::<3>(" x # y ");
        assert_eq!((a, b, c), ("x", "y", ""));
    }

    #[test]
    fn test_split_fields_ignores_extra() {
        let [a, b] = split_fields::<2>("x#y#z");
        assert_eq!((a, b), ("x", "y"));
    }

    #[test]
    fn test_entries_keep_single_values_whole() {
        let single = AccountSource::Single(vec!["tok".into(), "a=1&b=2#x\ny".into()]);
        assert_eq!(entries::<3>(&single), vec![["tok", "a=1&b=2#x\ny", ""]]);
        assert_eq!(
            entries::<2>(&listed("t1#c1\nt2")),
            vec![["t1", "c1"], ["t2", ""]]
        );
    }

    #[test]
    fn test_label_or_position() {
        assert_eq!(label_or_position("", 2), "Account 2");
        assert_eq!(label_or_position("main", 2), "main");
    }
}

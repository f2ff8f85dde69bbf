//! Credential-refreshing, retry-aware check-in engine.
//!
//! Leaves first: [`classify::classify`] turns a transport outcome into a
//! [`classify::StepOutcome`]; [`StepExecutor`] resolves retries and the
//! one-shot credential refresh into a terminal [`executor::StepResult`];
//! [`WorkflowRunner`] sequences one account's steps; [`BatchOrchestrator`]
//! runs every account of a service in order and yields a [`BatchReport`].

pub mod account;
pub mod batch;
pub mod classify;
pub mod error;
pub mod executor;
pub mod service;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use self::account::{Account, AccountResult, BatchReport, Credential};
pub use self::batch::BatchOrchestrator;
pub use self::classify::ClassifierRules;
pub use self::executor::StepExecutor;
pub use self::service::{Service, Step, StepHistory, StepSpec};
pub use self::workflow::WorkflowRunner;

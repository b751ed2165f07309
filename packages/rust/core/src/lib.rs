//! Client-side state and orchestration for ragdeck.
//!
//! This crate owns everything the operator sees change: the configuration
//! store, the build log display, and one query panel per pipeline. All
//! network access goes through the [`Backend`] port; [`Shell`] composes the
//! components and routes completed requests back to them.

pub mod backend;
pub mod build;
pub mod config_store;
pub mod notice;
pub mod query;
pub mod sequence;
pub mod shell;

#[cfg(test)]
mod testing;

pub use backend::{Backend, BackendFuture, Pending};
pub use build::{BuildOrchestrator, BuildOutcome, BuildPhase};
pub use config_store::{ConfigStore, LoadOutcome, LoadState, SaveOutcome, SaveStatus};
pub use notice::Notice;
pub use query::{QueryClient, QueryOutcome, QueryPhase};
pub use sequence::{Disposition, Liveness, Sequencer, Ticket};
pub use shell::{Shell, ShellEvent};

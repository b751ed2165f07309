//! Build orchestration across all configured pipelines.

use chrono::{DateTime, Utc};
use ragdeck_shared::{BuildLogMap, BuildResponse, Result};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Pending};
use crate::notice::Notice;
use crate::sequence::{Disposition, Sequencer, Ticket};

/// Completed `POST /build`, ready to be applied.
#[derive(Debug)]
pub struct BuildOutcome {
    ticket: Ticket,
    result: Result<BuildResponse>,
}

impl BuildOutcome {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Idle,
    Building,
}

/// Triggers builds and owns the displayed per-pipeline build logs.
#[derive(Debug)]
pub struct BuildOrchestrator {
    logs: BuildLogMap,
    builds: Sequencer,
    last_built: Option<DateTime<Utc>>,
    notice: Option<Notice>,
}

impl BuildOrchestrator {
    pub fn new() -> Self {
        Self {
            logs: BuildLogMap::new(),
            builds: Sequencer::new(),
            last_built: None,
            notice: None,
        }
    }

    /// Logs from the most recent applied build.
    pub fn logs(&self) -> &BuildLogMap {
        &self.logs
    }

    pub fn phase(&self) -> BuildPhase {
        if self.builds.in_flight() {
            BuildPhase::Building
        } else {
            BuildPhase::Idle
        }
    }

    pub fn last_built(&self) -> Option<DateTime<Utc>> {
        self.last_built
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Start a build. The backend decides which pipelines take part.
    pub fn trigger(&mut self, backend: &dyn Backend) -> Pending<BuildOutcome> {
        let ticket = self.builds.issue();
        info!(seq = ticket.seq(), "triggering build");
        let request = backend.build();
        Box::pin(async move {
            let result = request.await;
            BuildOutcome { ticket, result }
        })
    }

    /// Apply a completed build.
    ///
    /// A successful response replaces the whole log map; pipelines missing from
    /// it disappear from the display. Responses older than one already applied
    /// are discarded.
    pub fn apply(&mut self, outcome: BuildOutcome) -> Disposition {
        let BuildOutcome { ticket, result } = outcome;
        let disposition = self.builds.settle(&ticket);
        if disposition != Disposition::Applied {
            debug!(seq = ticket.seq(), %disposition, "discarding build response");
            return disposition;
        }

        match result {
            Ok(response) => {
                info!(
                    seq = ticket.seq(),
                    pipelines = response.logs.len(),
                    "build finished"
                );
                self.logs = response.logs;
                self.last_built = Some(Utc::now());
                self.notice = None;
            }
            Err(e) => {
                warn!(error = %e, "build failed");
                self.notice = Some(Notice::from_error(&e));
            }
        }
        disposition
    }

    /// Detach any build still in flight.
    pub fn teardown(&mut self) {
        self.builds.teardown();
    }
}

impl Default for BuildOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, build_response};
    use ragdeck_shared::{ErrorKind, RagDeckError};

    #[tokio::test]
    async fn build_replaces_logs_wholesale() {
        let backend = ScriptedBackend::new();
        let mut orchestrator = BuildOrchestrator::new();

        backend
            .expect_build()
            .send(Ok(build_response(vec![
                ("langchain", vec!["indexed 240 vectors"]),
                ("llamaindex", vec!["built index"]),
                ("haystack", vec!["wrote 240 documents"]),
            ])))
            .unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        orchestrator.apply(outcome);
        assert_eq!(orchestrator.logs().len(), 3);

        backend
            .expect_build()
            .send(Ok(build_response(vec![
                ("langchain", vec!["indexed 250 vectors"]),
                ("haystack", vec!["wrote 250 documents"]),
            ])))
            .unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        orchestrator.apply(outcome);

        let logs = orchestrator.logs();
        assert_eq!(logs.len(), 2);
        assert!(!logs.contains_key("llamaindex"));
        assert_eq!(logs["langchain"], vec!["indexed 250 vectors".to_string()]);
        assert!(orchestrator.last_built().is_some());
    }

    #[tokio::test]
    async fn later_issued_build_wins_when_it_resolves_first() {
        let backend = ScriptedBackend::new();
        let mut orchestrator = BuildOrchestrator::new();

        let first_reply = backend.expect_build();
        let second_reply = backend.expect_build();
        let first = orchestrator.trigger(&backend);
        let second = orchestrator.trigger(&backend);
        assert_eq!(orchestrator.phase(), BuildPhase::Building);

        second_reply
            .send(Ok(build_response(vec![("haystack", vec!["second"])])))
            .unwrap();
        assert_eq!(orchestrator.apply(second.await), Disposition::Applied);
        assert_eq!(orchestrator.phase(), BuildPhase::Idle);

        first_reply
            .send(Ok(build_response(vec![("langchain", vec!["first"])])))
            .unwrap();
        assert_eq!(orchestrator.apply(first.await), Disposition::Stale);

        let expected = build_response(vec![("haystack", vec!["second"])]).logs;
        assert_eq!(orchestrator.logs(), &expected);
    }

    #[tokio::test]
    async fn failed_build_keeps_previous_logs() {
        let backend = ScriptedBackend::new();
        let mut orchestrator = BuildOrchestrator::new();

        backend
            .expect_build()
            .send(Ok(build_response(vec![("langchain", vec!["ok"])])))
            .unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        orchestrator.apply(outcome);

        backend
            .expect_build()
            .send(Err(RagDeckError::transport("timed out")))
            .unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        assert_eq!(orchestrator.apply(outcome), Disposition::Applied);

        assert_eq!(orchestrator.logs().len(), 1);
        assert_eq!(orchestrator.notice().unwrap().kind, ErrorKind::Transport);
        assert_eq!(orchestrator.phase(), BuildPhase::Idle);
    }

    #[tokio::test]
    async fn success_clears_the_failure_notice() {
        let backend = ScriptedBackend::new();
        let mut orchestrator = BuildOrchestrator::new();

        backend
            .expect_build()
            .send(Err(RagDeckError::decode("POST /build", "expected `logs`")))
            .unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        orchestrator.apply(outcome);
        assert!(orchestrator.notice().is_some());

        backend.expect_build().send(Ok(build_response(vec![]))).unwrap();
        let outcome = orchestrator.trigger(&backend).await;
        orchestrator.apply(outcome);
        assert!(orchestrator.notice().is_none());
        assert!(orchestrator.logs().is_empty());
    }

    #[tokio::test]
    async fn torn_down_orchestrator_ignores_late_response() {
        let backend = ScriptedBackend::new();
        let mut orchestrator = BuildOrchestrator::new();
        let reply = backend.expect_build();
        let pending = orchestrator.trigger(&backend);

        orchestrator.teardown();
        reply
            .send(Ok(build_response(vec![("langchain", vec!["late"])])))
            .unwrap();
        let outcome = pending.await;
        assert!(!outcome.ticket().is_live());
        assert_eq!(orchestrator.apply(outcome), Disposition::Detached);
        assert!(orchestrator.logs().is_empty());
    }
}

//! Per-pipeline question/answer cycle.
//!
//! Each [`QueryClient`] is bound to one pipeline for its whole life and owns
//! its [`QueryState`] exclusively; nothing it does reads or writes another
//! panel's state.

use ragdeck_shared::{Pipeline, QueryRequest, QueryResponse, QueryState, RagDeckError, Result};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Pending};
use crate::notice::Notice;
use crate::sequence::{Disposition, Sequencer, Ticket};

/// Completed `POST /query`, ready to be applied.
#[derive(Debug)]
pub struct QueryOutcome {
    pipeline: Pipeline,
    ticket: Ticket,
    result: Result<QueryResponse>,
}

impl QueryOutcome {
    /// Pipeline of the panel that issued the request.
    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPhase {
    Idle,
    Asking,
}

/// One query panel.
#[derive(Debug)]
pub struct QueryClient {
    pipeline: Pipeline,
    state: QueryState,
    asks: Sequencer,
    notice: Option<Notice>,
}

impl QueryClient {
    pub fn new(pipeline: Pipeline) -> Self {
        Self {
            pipeline,
            state: QueryState::default(),
            asks: Sequencer::new(),
            notice: None,
        }
    }

    pub fn pipeline(&self) -> Pipeline {
        self.pipeline
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn question(&self) -> &str {
        &self.state.question
    }

    pub fn answer(&self) -> &str {
        &self.state.answer
    }

    pub fn logs(&self) -> &[String] {
        &self.state.logs
    }

    pub fn phase(&self) -> QueryPhase {
        if self.asks.in_flight() {
            QueryPhase::Asking
        } else {
            QueryPhase::Idle
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Mirror the operator's raw input.
    pub fn set_question(&mut self, raw: impl Into<String>) {
        self.state.question = raw.into();
    }

    /// Send the current question to this panel's pipeline.
    ///
    /// Blank or whitespace-only questions are rejected here with a validation
    /// error; no request is issued.
    pub fn ask(&mut self, backend: &dyn Backend) -> Result<Pending<QueryOutcome>> {
        if self.state.question.trim().is_empty() {
            let err = RagDeckError::validation("question must not be blank");
            self.notice = Some(Notice::from_error(&err));
            return Err(err);
        }

        let ticket = self.asks.issue();
        let pipeline = self.pipeline;
        let request = QueryRequest {
            pipeline,
            question: self.state.question.clone(),
        };
        info!(%pipeline, seq = ticket.seq(), "asking pipeline");
        let response = backend.query(&request);

        Ok(Box::pin(async move {
            let result = response.await;
            QueryOutcome {
                pipeline,
                ticket,
                result,
            }
        }))
    }

    /// Apply a completed query. Only this panel's answer and logs change.
    pub fn apply(&mut self, outcome: QueryOutcome) -> Disposition {
        let QueryOutcome {
            pipeline,
            ticket,
            result,
        } = outcome;
        if pipeline != self.pipeline {
            return Disposition::Detached;
        }
        let disposition = self.asks.settle(&ticket);
        if disposition != Disposition::Applied {
            debug!(%pipeline, seq = ticket.seq(), %disposition, "discarding answer");
            return disposition;
        }

        match result {
            Ok(response) => {
                info!(
                    %pipeline,
                    seq = ticket.seq(),
                    lines = response.logs.len(),
                    "answer received"
                );
                self.state.answer = response.answer;
                self.state.logs = response.logs;
                self.notice = None;
            }
            Err(e) => {
                warn!(%pipeline, error = %e, "query failed");
                self.notice = Some(Notice::from_error(&e));
            }
        }
        disposition
    }

    /// Detach any query still in flight.
    pub fn teardown(&mut self) {
        self.asks.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBackend, answer};
    use ragdeck_shared::ErrorKind;

    #[tokio::test]
    async fn ask_sends_pipeline_and_question() {
        let backend = ScriptedBackend::new();
        let mut panel = QueryClient::new(Pipeline::LlamaIndex);
        panel.set_question("What is chunk overlap?");

        let reply = backend.expect_query(Pipeline::LlamaIndex);
        let pending = panel.ask(&backend).unwrap();
        assert_eq!(panel.phase(), QueryPhase::Asking);

        reply
            .send(Ok(answer("Shared tokens between chunks.", &["retrieved 5 chunks"])))
            .unwrap();
        assert_eq!(panel.apply(pending.await), Disposition::Applied);

        assert_eq!(panel.phase(), QueryPhase::Idle);
        assert_eq!(panel.answer(), "Shared tokens between chunks.");
        assert_eq!(panel.logs(), ["retrieved 5 chunks".to_string()]);
        assert_eq!(panel.question(), "What is chunk overlap?");

        let asked = backend.asked.lock().unwrap();
        assert_eq!(asked.len(), 1);
        assert_eq!(asked[0].pipeline, Pipeline::LlamaIndex);
        assert_eq!(asked[0].question, "What is chunk overlap?");
    }

    #[tokio::test]
    async fn blank_question_is_rejected_locally() {
        let backend = ScriptedBackend::new();
        let mut panel = QueryClient::new(Pipeline::LangChain);

        for blank in ["", "   ", "\t\n"] {
            panel.set_question(blank);
            let err = panel.ask(&backend).err().expect("blank question rejected");
            assert!(matches!(err, RagDeckError::Validation { .. }));
        }
        assert_eq!(panel.phase(), QueryPhase::Idle);
        assert_eq!(panel.notice().unwrap().kind, ErrorKind::Validation);
        assert!(backend.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn question_mirrors_raw_input() {
        let mut panel = QueryClient::new(Pipeline::Haystack);
        panel.set_question("  padded?  ");
        assert_eq!(panel.question(), "  padded?  ");
        assert_eq!(panel.state().answer, "");
    }

    #[tokio::test]
    async fn newest_ask_wins() {
        let backend = ScriptedBackend::new();
        let mut panel = QueryClient::new(Pipeline::Haystack);

        let first_reply = backend.expect_query(Pipeline::Haystack);
        let second_reply = backend.expect_query(Pipeline::Haystack);
        panel.set_question("first?");
        let first = panel.ask(&backend).unwrap();
        panel.set_question("second?");
        let second = panel.ask(&backend).unwrap();

        second_reply.send(Ok(answer("second", &["b"]))).unwrap();
        first_reply.send(Ok(answer("first", &["a"]))).unwrap();

        assert_eq!(panel.apply(second.await), Disposition::Applied);
        assert_eq!(panel.apply(first.await), Disposition::Stale);
        assert_eq!(panel.answer(), "second");
        assert_eq!(panel.logs(), ["b".to_string()]);
    }

    #[tokio::test]
    async fn failure_keeps_previous_answer() {
        let backend = ScriptedBackend::new();
        let mut panel = QueryClient::new(Pipeline::LangChain);
        panel.set_question("q");

        backend
            .expect_query(Pipeline::LangChain)
            .send(Ok(answer("a1", &["l1"])))
            .unwrap();
        let outcome = panel.ask(&backend).unwrap().await;
        panel.apply(outcome);

        backend
            .expect_query(Pipeline::LangChain)
            .send(Err(RagDeckError::Status {
                endpoint: "POST /query".into(),
                status: 502,
                body: "upstream".into(),
            }))
            .unwrap();
        let outcome = panel.ask(&backend).unwrap().await;
        panel.apply(outcome);

        assert_eq!(panel.answer(), "a1");
        assert_eq!(panel.notice().unwrap().kind, ErrorKind::Status);
        assert_eq!(panel.phase(), QueryPhase::Idle);
    }

    #[tokio::test]
    async fn panels_are_isolated() {
        let backend = ScriptedBackend::new();
        let mut langchain = QueryClient::new(Pipeline::LangChain);
        let mut haystack = QueryClient::new(Pipeline::Haystack);

        // Give haystack some prior state, then leave a request in flight.
        haystack.set_question("earlier?");
        backend
            .expect_query(Pipeline::Haystack)
            .send(Ok(answer("earlier answer", &["h0"])))
            .unwrap();
        let outcome = haystack.ask(&backend).unwrap().await;
        haystack.apply(outcome);

        let haystack_reply = backend.expect_query(Pipeline::Haystack);
        haystack.set_question("pending?");
        let haystack_pending = haystack.ask(&backend).unwrap();
        let haystack_before = haystack.state().clone();

        langchain.set_question("now?");
        backend
            .expect_query(Pipeline::LangChain)
            .send(Ok(answer("langchain answer", &["l1"])))
            .unwrap();
        let outcome = langchain.ask(&backend).unwrap().await;
        langchain.apply(outcome);

        assert_eq!(haystack.state(), &haystack_before);
        assert_eq!(haystack.phase(), QueryPhase::Asking);
        assert_eq!(langchain.answer(), "langchain answer");

        haystack_reply.send(Ok(answer("haystack answer", &["h1"]))).unwrap();
        let outcome = haystack_pending.await;

        // An outcome can only be applied by the panel that issued it.
        let mut other = QueryClient::new(Pipeline::LangChain);
        assert_eq!(other.apply(outcome), Disposition::Detached);
        assert_eq!(langchain.answer(), "langchain answer");
    }

    #[tokio::test]
    async fn torn_down_panel_ignores_late_answer() {
        let backend = ScriptedBackend::new();
        let mut panel = QueryClient::new(Pipeline::LlamaIndex);
        panel.set_question("q");
        let reply = backend.expect_query(Pipeline::LlamaIndex);
        let pending = panel.ask(&backend).unwrap();

        panel.teardown();
        reply.send(Ok(answer("late", &[]))).unwrap();
        assert_eq!(panel.apply(pending.await), Disposition::Detached);
        assert_eq!(panel.answer(), "");
    }
}

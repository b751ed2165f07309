//! Composition of one config store, one build orchestrator and one query
//! panel per pipeline.
//!
//! The shell forwards operator intents to the component that owns the state,
//! runs the resulting requests on the tokio runtime, and routes completed
//! responses back as [`ShellEvent`]s. It holds no state of its own beyond the
//! components.

use std::collections::BTreeMap;
use std::sync::Arc;

use ragdeck_shared::{Field, Pipeline, RagDeckError, RawValue, Result};
use tokio::sync::mpsc;
use tracing::debug;

use crate::backend::{Backend, Pending};
use crate::build::{BuildOrchestrator, BuildOutcome};
use crate::config_store::{ConfigStore, LoadOutcome, SaveOutcome};
use crate::query::{QueryClient, QueryOutcome};
use crate::sequence::{Disposition, Ticket};

/// A completed request on its way back to the component that issued it.
#[derive(Debug)]
pub enum ShellEvent {
    ConfigLoaded(LoadOutcome),
    ConfigSaved(SaveOutcome),
    BuildFinished(BuildOutcome),
    Answered(QueryOutcome),
}

impl ShellEvent {
    fn ticket(&self) -> &Ticket {
        match self {
            Self::ConfigLoaded(o) => o.ticket(),
            Self::ConfigSaved(o) => o.ticket(),
            Self::BuildFinished(o) => o.ticket(),
            Self::Answered(o) => o.ticket(),
        }
    }
}

pub struct Shell {
    backend: Arc<dyn Backend>,
    events: mpsc::UnboundedSender<ShellEvent>,
    config: ConfigStore,
    build: BuildOrchestrator,
    panels: BTreeMap<Pipeline, QueryClient>,
}

impl Shell {
    /// Create a shell with every pipeline panel mounted.
    ///
    /// The receiver yields completed requests; feed each one to
    /// [`Shell::dispatch`].
    pub fn new(backend: Arc<dyn Backend>) -> (Self, mpsc::UnboundedReceiver<ShellEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let panels = Pipeline::ALL
            .into_iter()
            .map(|p| (p, QueryClient::new(p)))
            .collect();
        let shell = Self {
            backend,
            events,
            config: ConfigStore::new(),
            build: BuildOrchestrator::new(),
            panels,
        };
        (shell, rx)
    }

    // -----------------------------------------------------------------------
    // Component access
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    pub fn build(&self) -> &BuildOrchestrator {
        &self.build
    }

    /// The panel for `pipeline`, if mounted.
    pub fn panel(&self, pipeline: Pipeline) -> Option<&QueryClient> {
        self.panels.get(&pipeline)
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Load the canonical configuration. Must run inside a tokio runtime.
    pub fn mount(&mut self) {
        self.reload_config();
    }

    pub fn reload_config(&mut self) {
        let pending = self.config.load(self.backend.as_ref());
        self.spawn(pending, ShellEvent::ConfigLoaded);
    }

    pub fn edit_config(&mut self, field: Field, raw: impl Into<RawValue>) -> Result<()> {
        self.config.update(field, raw)
    }

    pub fn save_config(&mut self) -> Result<()> {
        let pending = self.config.save(self.backend.as_ref())?;
        self.spawn(pending, ShellEvent::ConfigSaved);
        Ok(())
    }

    pub fn trigger_build(&mut self) {
        let pending = self.build.trigger(self.backend.as_ref());
        self.spawn(pending, ShellEvent::BuildFinished);
    }

    pub fn set_question(&mut self, pipeline: Pipeline, raw: impl Into<String>) -> Result<()> {
        self.panel_mut(pipeline)?.set_question(raw);
        Ok(())
    }

    pub fn ask(&mut self, pipeline: Pipeline) -> Result<()> {
        let backend = Arc::clone(&self.backend);
        let pending = self.panel_mut(pipeline)?.ask(backend.as_ref())?;
        self.spawn(pending, ShellEvent::Answered);
        Ok(())
    }

    /// Mount a fresh panel for `pipeline`. Does nothing if already mounted.
    pub fn mount_panel(&mut self, pipeline: Pipeline) {
        self.panels
            .entry(pipeline)
            .or_insert_with(|| QueryClient::new(pipeline));
    }

    /// Unmount the panel for `pipeline`; its in-flight answer will be dropped.
    pub fn unmount_panel(&mut self, pipeline: Pipeline) {
        if let Some(mut panel) = self.panels.remove(&pipeline) {
            panel.teardown();
            debug!(%pipeline, "panel unmounted");
        }
    }

    /// Route a completed request to the component that issued it.
    pub fn dispatch(&mut self, event: ShellEvent) -> Disposition {
        match event {
            ShellEvent::ConfigLoaded(outcome) => self.config.apply_load(outcome),
            ShellEvent::ConfigSaved(outcome) => self.config.apply_save(outcome),
            ShellEvent::BuildFinished(outcome) => self.build.apply(outcome),
            ShellEvent::Answered(outcome) => match self.panels.get_mut(&outcome.pipeline()) {
                Some(panel) => panel.apply(outcome),
                None => Disposition::Detached,
            },
        }
    }

    /// Tear down every component; responses still in flight will be dropped.
    pub fn teardown(&mut self) {
        self.config.teardown();
        self.build.teardown();
        for panel in self.panels.values_mut() {
            panel.teardown();
        }
    }

    fn panel_mut(&mut self, pipeline: Pipeline) -> Result<&mut QueryClient> {
        self.panels
            .get_mut(&pipeline)
            .ok_or_else(|| RagDeckError::validation(format!("{pipeline} panel is not mounted")))
    }

    fn spawn<T: Send + 'static>(&self, pending: Pending<T>, wrap: fn(T) -> ShellEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = wrap(pending.await);
            if !event.ticket().is_live() {
                debug!("issuer gone, dropping response");
                return;
            }
            // A closed receiver means the page itself is gone.
            let _ = events.send(event);
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config_store::LoadState;
    use crate::query::QueryPhase;
    use crate::testing::{ScriptedBackend, answer, build_response, sample_config};
    use ragdeck_shared::ErrorKind;

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ShellEvent>) -> ShellEvent {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("event within a second")
            .expect("channel open")
    }

    async fn no_event(rx: &mut mpsc::UnboundedReceiver<ShellEvent>) {
        let got = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(got.is_err(), "unexpected event");
    }

    async fn mounted(backend: &Arc<ScriptedBackend>) -> (Shell, mpsc::UnboundedReceiver<ShellEvent>) {
        let (mut shell, mut rx) = Shell::new(backend.clone());
        backend.expect_config().send(Ok(sample_config())).unwrap();
        shell.mount();
        let event = next_event(&mut rx).await;
        assert_eq!(shell.dispatch(event), Disposition::Applied);
        (shell, rx)
    }

    #[tokio::test]
    async fn mount_loads_configuration() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = Shell::new(backend.clone());
        assert_eq!(shell.config().load_state(), LoadState::Unloaded);

        let reply = backend.expect_config();
        shell.mount();
        assert_eq!(shell.config().load_state(), LoadState::Loading);

        reply.send(Ok(sample_config())).unwrap();
        let event = next_event(&mut rx).await;
        shell.dispatch(event);
        assert_eq!(shell.config().load_state(), LoadState::Loaded);
    }

    #[tokio::test]
    async fn edit_then_save_posts_the_edited_tree() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = mounted(&backend).await;

        shell.edit_config(Field::ChunkSize, "1000").unwrap();
        backend.expect_save().send(Ok(serde_json::json!({"ok": true}))).unwrap();
        shell.save_config().unwrap();
        let event = next_event(&mut rx).await;
        shell.dispatch(event);

        let mut expected = serde_json::to_value(sample_config()).unwrap();
        expected["chunking"]["chunk_size"] = serde_json::json!(1000);
        let sent = serde_json::to_value(&backend.saved.lock().unwrap()[0]).unwrap();
        assert_eq!(sent, expected);
    }

    #[tokio::test]
    async fn failures_stay_in_their_component() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = mounted(&backend).await;

        backend
            .expect_query(Pipeline::Haystack)
            .send(Err(RagDeckError::transport("connection reset")))
            .unwrap();
        shell.set_question(Pipeline::Haystack, "why?").unwrap();
        shell.ask(Pipeline::Haystack).unwrap();
        let event = next_event(&mut rx).await;
        shell.dispatch(event);

        let haystack = shell.panel(Pipeline::Haystack).unwrap();
        assert_eq!(haystack.notice().unwrap().kind, ErrorKind::Transport);
        assert!(shell.panel(Pipeline::LangChain).unwrap().notice().is_none());
        assert!(shell.panel(Pipeline::LlamaIndex).unwrap().notice().is_none());
        assert!(shell.build().notice().is_none());
        assert!(shell.config().notice().is_none());

        // The page stays usable.
        backend
            .expect_build()
            .send(Ok(build_response(vec![("langchain", vec!["done"])])))
            .unwrap();
        shell.trigger_build();
        let event = next_event(&mut rx).await;
        assert_eq!(shell.dispatch(event), Disposition::Applied);
        assert_eq!(shell.build().logs().len(), 1);
    }

    #[tokio::test]
    async fn asking_one_panel_leaves_another_in_flight_panel_untouched() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = mounted(&backend).await;

        let haystack_reply = backend.expect_query(Pipeline::Haystack);
        shell.set_question(Pipeline::Haystack, "slow question").unwrap();
        shell.ask(Pipeline::Haystack).unwrap();
        let haystack_before = shell.panel(Pipeline::Haystack).unwrap().state().clone();

        backend
            .expect_query(Pipeline::LangChain)
            .send(Ok(answer("fast", &["l"])))
            .unwrap();
        shell.set_question(Pipeline::LangChain, "fast question").unwrap();
        shell.ask(Pipeline::LangChain).unwrap();
        let event = next_event(&mut rx).await;
        shell.dispatch(event);

        let haystack = shell.panel(Pipeline::Haystack).unwrap();
        assert_eq!(haystack.state(), &haystack_before);
        assert_eq!(haystack.phase(), QueryPhase::Asking);
        assert_eq!(shell.panel(Pipeline::LangChain).unwrap().answer(), "fast");

        haystack_reply.send(Ok(answer("slow", &["h"]))).unwrap();
        let event = next_event(&mut rx).await;
        shell.dispatch(event);
        assert_eq!(shell.panel(Pipeline::Haystack).unwrap().answer(), "slow");
        assert_eq!(shell.panel(Pipeline::LangChain).unwrap().answer(), "fast");
    }

    #[tokio::test]
    async fn unmounted_panel_never_receives_its_answer() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = mounted(&backend).await;

        let reply = backend.expect_query(Pipeline::LlamaIndex);
        shell.set_question(Pipeline::LlamaIndex, "q").unwrap();
        shell.ask(Pipeline::LlamaIndex).unwrap();

        shell.unmount_panel(Pipeline::LlamaIndex);
        assert!(shell.panel(Pipeline::LlamaIndex).is_none());
        assert!(shell.ask(Pipeline::LlamaIndex).is_err());

        shell.mount_panel(Pipeline::LlamaIndex);
        reply.send(Ok(answer("too late", &[]))).unwrap();
        no_event(&mut rx).await;

        let fresh = shell.panel(Pipeline::LlamaIndex).unwrap();
        assert_eq!(fresh.answer(), "");
        assert_eq!(fresh.question(), "");
        assert_eq!(fresh.phase(), QueryPhase::Idle);
    }

    #[tokio::test]
    async fn teardown_drops_pending_build() {
        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = mounted(&backend).await;

        let reply = backend.expect_build();
        shell.trigger_build();
        shell.teardown();

        reply
            .send(Ok(build_response(vec![("haystack", vec!["late"])])))
            .unwrap();
        no_event(&mut rx).await;
        assert!(shell.build().logs().is_empty());
    }

    #[test]
    fn requests_complete_while_a_plain_thread_polls_for_events() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();

        let backend = Arc::new(ScriptedBackend::new());
        let (mut shell, mut rx) = Shell::new(backend.clone());
        let reply = backend.expect_config();
        shell.mount();
        reply.send(Ok(sample_config())).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(1);
        let event = loop {
            match rx.try_recv() {
                Ok(event) => break event,
                Err(mpsc::error::TryRecvError::Empty) if std::time::Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(e) => panic!("no event: {e:?}"),
            }
        };
        assert_eq!(shell.dispatch(event), Disposition::Applied);
        assert_eq!(shell.config().load_state(), LoadState::Loaded);
    }
}

//! Scripted backend for exercising ordering in tests.
//!
//! Each call takes the next queued reply slot at call time; the test decides
//! when (and in which order) to fill the slots through the returned senders.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use ragdeck_shared::{
    BuildLogMap, BuildResponse, Pipeline, QueryRequest, QueryResponse, RagConfig, RagDeckError,
    Result, SaveAck,
};
use tokio::sync::oneshot;

use crate::backend::{Backend, BackendFuture};

pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

struct Script<T> {
    slots: Mutex<VecDeque<oneshot::Receiver<Result<T>>>>,
}

impl<T: Send + 'static> Script<T> {
    fn new() -> Self {
        Self {
            slots: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self) -> Reply<T> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().unwrap().push_back(rx);
        tx
    }

    fn next(&self, endpoint: &'static str) -> BackendFuture<T> {
        let slot = self.slots.lock().unwrap().pop_front();
        Box::pin(async move {
            match slot {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(RagDeckError::transport("reply dropped"))),
                None => Err(RagDeckError::transport(format!(
                    "no scripted reply for {endpoint}"
                ))),
            }
        })
    }
}

pub(crate) struct ScriptedBackend {
    config: Script<RagConfig>,
    save: Script<SaveAck>,
    build: Script<BuildResponse>,
    queries: HashMap<Pipeline, Script<QueryResponse>>,
    pub(crate) saved: Mutex<Vec<RagConfig>>,
    pub(crate) asked: Mutex<Vec<QueryRequest>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            config: Script::new(),
            save: Script::new(),
            build: Script::new(),
            queries: Pipeline::ALL.into_iter().map(|p| (p, Script::new())).collect(),
            saved: Mutex::new(Vec::new()),
            asked: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn expect_config(&self) -> Reply<RagConfig> {
        self.config.push()
    }

    pub(crate) fn expect_save(&self) -> Reply<SaveAck> {
        self.save.push()
    }

    pub(crate) fn expect_build(&self) -> Reply<BuildResponse> {
        self.build.push()
    }

    pub(crate) fn expect_query(&self, pipeline: Pipeline) -> Reply<QueryResponse> {
        self.queries[&pipeline].push()
    }
}

impl Backend for ScriptedBackend {
    fn fetch_config(&self) -> BackendFuture<RagConfig> {
        self.config.next("GET /config")
    }

    fn save_config(&self, config: &RagConfig) -> BackendFuture<SaveAck> {
        self.saved.lock().unwrap().push(config.clone());
        self.save.next("POST /config")
    }

    fn build(&self) -> BackendFuture<BuildResponse> {
        self.build.next("POST /build")
    }

    fn query(&self, request: &QueryRequest) -> BackendFuture<QueryResponse> {
        self.asked.lock().unwrap().push(request.clone());
        self.queries[&request.pipeline].next("POST /query")
    }
}

pub(crate) fn sample_config() -> RagConfig {
    let raw = std::fs::read_to_string("../../../fixtures/json/config.fixture.json")
        .expect("read config fixture");
    serde_json::from_str(&raw).expect("deserialize config fixture")
}

pub(crate) fn build_response(entries: Vec<(&str, Vec<&str>)>) -> BuildResponse {
    let logs: BuildLogMap = entries
        .into_iter()
        .map(|(name, lines)| {
            (
                name.to_string(),
                lines.iter().map(|l| l.to_string()).collect(),
            )
        })
        .collect();
    BuildResponse { logs }
}

pub(crate) fn answer(text: &str, logs: &[&str]) -> QueryResponse {
    QueryResponse {
        answer: text.to_string(),
        logs: logs.iter().map(|l| l.to_string()).collect(),
    }
}

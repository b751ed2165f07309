//! Core domain and wire types for ragdeck.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::RagDeckError;

// ---------------------------------------------------------------------------
// RagConfig
// ---------------------------------------------------------------------------

/// The configuration tree served by `GET /config` and accepted by `POST /config`.
///
/// Every section is required: a body missing one fails to decode rather than
/// producing a partially populated tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagConfig {
    pub loaders: LoadersConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
}

/// `loaders` section: where source documents are read from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadersConfig {
    pub directory: String,
    pub pattern: String,
}

/// `chunking` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub chunk_size: u32,
    pub overlap: u32,
}

/// `embedding` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub api_key: String,
    pub base_url: String,
}

/// `vector_store` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(rename = "type")]
    pub store_type: String,
    pub dimension: u32,
    pub metric: String,
}

/// `retrieval` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub top_k: u32,
    /// Serialized as `null` when absent so the tree round-trips unchanged.
    pub reranker: Option<String>,
    pub reranker_api_key: String,
    pub reranker_base_url: String,
    pub hybrid: bool,
}

/// `llm` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub temperature: f64,
    pub api_key: String,
    pub base_url: String,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// One of the independently named RAG backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pipeline {
    LangChain,
    LlamaIndex,
    Haystack,
}

impl Pipeline {
    /// All pipelines, in display order.
    pub const ALL: [Pipeline; 3] = [Pipeline::LangChain, Pipeline::LlamaIndex, Pipeline::Haystack];

    /// Wire identifier (`"langchain"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LangChain => "langchain",
            Self::LlamaIndex => "llamaindex",
            Self::Haystack => "haystack",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::LangChain => "LangChain",
            Self::LlamaIndex => "LlamaIndex",
            Self::Haystack => "Haystack",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Pipeline {
    type Err = RagDeckError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Pipeline::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RagDeckError::validation(format!("unknown pipeline {s}")))
    }
}

// ---------------------------------------------------------------------------
// Build / query state
// ---------------------------------------------------------------------------

/// Pipeline name to ordered log lines, as returned by `POST /build`.
///
/// Keys are kept as strings: the backend decides which pipelines it built.
pub type BuildLogMap = BTreeMap<String, Vec<String>>;

/// The question/answer/log triple owned by one query panel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    /// Raw text as typed by the operator.
    pub question: String,
    /// Latest answer applied to this panel.
    pub answer: String,
    /// Log lines accompanying `answer`.
    pub logs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Wire bodies
// ---------------------------------------------------------------------------

/// Response body of `POST /build`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub logs: BuildLogMap,
}

/// Request body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub pipeline: Pipeline,
    pub question: String,
}

/// Response body of `POST /query`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    #[serde(default)]
    pub logs: Vec<String>,
}

/// Acknowledgement of `POST /config`. Its shape is up to the backend.
pub type SaveAck = serde_json::Value;

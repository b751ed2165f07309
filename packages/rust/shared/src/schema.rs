//! Per-field schema for the configuration tree.
//!
//! Every leaf of [`RagConfig`] is named by a [`Field`]. The schema declares
//! each leaf's type and validation independently of any rendering concern, so
//! coercing raw form input is testable without a UI.

use std::fmt;

use crate::error::{RagDeckError, Result};
use crate::types::RagConfig;

// ---------------------------------------------------------------------------
// Sections and fields
// ---------------------------------------------------------------------------

/// Top-level sections of the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Loaders,
    Chunking,
    Embedding,
    VectorStore,
    Retrieval,
    Llm,
}

impl Section {
    /// All sections, in tree order.
    pub const ALL: [Section; 6] = [
        Section::Loaders,
        Section::Chunking,
        Section::Embedding,
        Section::VectorStore,
        Section::Retrieval,
        Section::Llm,
    ];

    /// Key of this section in the JSON tree.
    pub fn key(self) -> &'static str {
        match self {
            Self::Loaders => "loaders",
            Self::Chunking => "chunking",
            Self::Embedding => "embedding",
            Self::VectorStore => "vector_store",
            Self::Retrieval => "retrieval",
            Self::Llm => "llm",
        }
    }

    /// Human-readable heading.
    pub fn title(self) -> &'static str {
        match self {
            Self::Loaders => "Loaders",
            Self::Chunking => "Chunking",
            Self::Embedding => "Embedding",
            Self::VectorStore => "Vector store",
            Self::Retrieval => "Retrieval",
            Self::Llm => "LLM",
        }
    }

    /// Fields belonging to this section, in tree order.
    pub fn fields(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| f.section() == self)
    }
}

/// Declared type of a leaf, with its validation bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Free text, passed through unchanged.
    Text,
    /// Text that may be absent; blank input clears it.
    OptionalText,
    /// Unsigned integer with an inclusive lower bound.
    Integer { min: u32 },
    /// Finite float within an inclusive range.
    Float { min: f64, max: f64 },
    /// Checkbox-style flag.
    Boolean,
}

/// Static description of one leaf.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub section: Section,
    pub key: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
}

/// One leaf of the configuration tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    LoadersDirectory,
    LoadersPattern,
    ChunkSize,
    ChunkOverlap,
    EmbeddingModel,
    EmbeddingApiKey,
    EmbeddingBaseUrl,
    VectorStoreType,
    VectorStoreDimension,
    VectorStoreMetric,
    RetrievalTopK,
    RetrievalReranker,
    RetrievalRerankerApiKey,
    RetrievalRerankerBaseUrl,
    RetrievalHybrid,
    LlmProvider,
    LlmModel,
    LlmTemperature,
    LlmApiKey,
    LlmBaseUrl,
}

impl Field {
    /// Every leaf, in tree order.
    pub const ALL: [Field; 20] = [
        Field::LoadersDirectory,
        Field::LoadersPattern,
        Field::ChunkSize,
        Field::ChunkOverlap,
        Field::EmbeddingModel,
        Field::EmbeddingApiKey,
        Field::EmbeddingBaseUrl,
        Field::VectorStoreType,
        Field::VectorStoreDimension,
        Field::VectorStoreMetric,
        Field::RetrievalTopK,
        Field::RetrievalReranker,
        Field::RetrievalRerankerApiKey,
        Field::RetrievalRerankerBaseUrl,
        Field::RetrievalHybrid,
        Field::LlmProvider,
        Field::LlmModel,
        Field::LlmTemperature,
        Field::LlmApiKey,
        Field::LlmBaseUrl,
    ];

    /// The schema entry for this leaf.
    pub fn spec(self) -> FieldSpec {
        use FieldKind::*;
        use Section::*;

        let (section, key, label, kind) = match self {
            Self::LoadersDirectory => (Loaders, "directory", "Directory", Text),
            Self::LoadersPattern => (Loaders, "pattern", "Glob pattern", Text),
            Self::ChunkSize => (Chunking, "chunk_size", "Chunk size", Integer { min: 1 }),
            Self::ChunkOverlap => (Chunking, "overlap", "Overlap", Integer { min: 0 }),
            Self::EmbeddingModel => (Embedding, "model", "Model", Text),
            Self::EmbeddingApiKey => (Embedding, "api_key", "API key", Text),
            Self::EmbeddingBaseUrl => (Embedding, "base_url", "Base URL", Text),
            Self::VectorStoreType => (VectorStore, "type", "Type", Text),
            Self::VectorStoreDimension => {
                (VectorStore, "dimension", "Dimension", Integer { min: 1 })
            }
            Self::VectorStoreMetric => (VectorStore, "metric", "Metric", Text),
            Self::RetrievalTopK => (Retrieval, "top_k", "Top K", Integer { min: 1 }),
            Self::RetrievalReranker => (Retrieval, "reranker", "Reranker", OptionalText),
            Self::RetrievalRerankerApiKey => {
                (Retrieval, "reranker_api_key", "Reranker API key", Text)
            }
            Self::RetrievalRerankerBaseUrl => {
                (Retrieval, "reranker_base_url", "Reranker base URL", Text)
            }
            Self::RetrievalHybrid => (Retrieval, "hybrid", "Hybrid search", Boolean),
            Self::LlmProvider => (Llm, "provider", "Provider", Text),
            Self::LlmModel => (Llm, "model", "Model", Text),
            Self::LlmTemperature => (
                Llm,
                "temperature",
                "Temperature",
                Float { min: 0.0, max: 2.0 },
            ),
            Self::LlmApiKey => (Llm, "api_key", "API key", Text),
            Self::LlmBaseUrl => (Llm, "base_url", "Base URL", Text),
        };

        FieldSpec {
            section,
            key,
            label,
            kind,
        }
    }

    pub fn section(self) -> Section {
        self.spec().section
    }

    pub fn key(self) -> &'static str {
        self.spec().key
    }

    pub fn kind(self) -> FieldKind {
        self.spec().kind
    }

    /// Dotted path, e.g. `chunking.chunk_size`.
    pub fn path(self) -> String {
        format!("{}.{}", self.section().key(), self.key())
    }

    /// Find the leaf for a `(section, key)` pair. Pairs outside the schema yield `None`.
    pub fn lookup(section: &str, key: &str) -> Option<Field> {
        Field::ALL
            .into_iter()
            .find(|f| f.section().key() == section && f.key() == key)
    }

    /// Find the leaf for a dotted path such as `llm.temperature`.
    pub fn from_path(path: &str) -> Option<Field> {
        let (section, key) = path.trim().split_once('.')?;
        Field::lookup(section, key)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section().key(), self.key())
    }
}

// ---------------------------------------------------------------------------
// Values and coercion
// ---------------------------------------------------------------------------

/// Untyped input as it arrives from a form element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// The element's text content.
    Text(String),
    /// The element's checked state.
    Checked(bool),
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for RawValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<bool> for RawValue {
    fn from(b: bool) -> Self {
        Self::Checked(b)
    }
}

/// A typed leaf value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    OptionalText(Option<String>),
    Integer(u32),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::OptionalText(Some(s)) => f.write_str(s),
            Self::OptionalText(None) => Ok(()),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Boolean(b) => write!(f, "{b}"),
        }
    }
}

/// Coerce raw input to the declared type of `field`, applying its validation.
pub fn coerce(field: Field, raw: RawValue) -> Result<Value> {
    match (field.kind(), raw) {
        (FieldKind::Text, RawValue::Text(s)) => Ok(Value::Text(s)),
        (FieldKind::OptionalText, RawValue::Text(s)) => {
            if s.trim().is_empty() {
                Ok(Value::OptionalText(None))
            } else {
                Ok(Value::OptionalText(Some(s)))
            }
        }
        (FieldKind::Integer { min }, RawValue::Text(s)) => {
            let n: u32 = s.trim().parse().map_err(|_| {
                RagDeckError::validation(format!(
                    "{field} must be a whole number, got '{}'",
                    s.trim()
                ))
            })?;
            if n < min {
                return Err(RagDeckError::validation(format!(
                    "{field} must be at least {min}, got {n}"
                )));
            }
            Ok(Value::Integer(n))
        }
        (FieldKind::Float { min, max }, RawValue::Text(s)) => {
            let x: f64 = s.trim().parse().map_err(|_| {
                RagDeckError::validation(format!("{field} must be a number, got '{}'", s.trim()))
            })?;
            if !x.is_finite() || x < min || x > max {
                return Err(RagDeckError::validation(format!(
                    "{field} must be between {min} and {max}, got {x}"
                )));
            }
            Ok(Value::Float(x))
        }
        (FieldKind::Boolean, RawValue::Checked(b)) => Ok(Value::Boolean(b)),
        (FieldKind::Boolean, RawValue::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(Value::Boolean(true)),
            "false" | "no" | "off" | "0" => Ok(Value::Boolean(false)),
            other => Err(RagDeckError::validation(format!(
                "{field} must be true or false, got '{other}'"
            ))),
        },
        (_, RawValue::Checked(_)) => Err(RagDeckError::validation(format!(
            "{field} is not a checkbox"
        ))),
    }
}

impl RagConfig {
    /// Read one leaf.
    pub fn get(&self, field: Field) -> Value {
        match field {
            Field::LoadersDirectory => Value::Text(self.loaders.directory.clone()),
            Field::LoadersPattern => Value::Text(self.loaders.pattern.clone()),
            Field::ChunkSize => Value::Integer(self.chunking.chunk_size),
            Field::ChunkOverlap => Value::Integer(self.chunking.overlap),
            Field::EmbeddingModel => Value::Text(self.embedding.model.clone()),
            Field::EmbeddingApiKey => Value::Text(self.embedding.api_key.clone()),
            Field::EmbeddingBaseUrl => Value::Text(self.embedding.base_url.clone()),
            Field::VectorStoreType => Value::Text(self.vector_store.store_type.clone()),
            Field::VectorStoreDimension => Value::Integer(self.vector_store.dimension),
            Field::VectorStoreMetric => Value::Text(self.vector_store.metric.clone()),
            Field::RetrievalTopK => Value::Integer(self.retrieval.top_k),
            Field::RetrievalReranker => Value::OptionalText(self.retrieval.reranker.clone()),
            Field::RetrievalRerankerApiKey => Value::Text(self.retrieval.reranker_api_key.clone()),
            Field::RetrievalRerankerBaseUrl => {
                Value::Text(self.retrieval.reranker_base_url.clone())
            }
            Field::RetrievalHybrid => Value::Boolean(self.retrieval.hybrid),
            Field::LlmProvider => Value::Text(self.llm.provider.clone()),
            Field::LlmModel => Value::Text(self.llm.model.clone()),
            Field::LlmTemperature => Value::Float(self.llm.temperature),
            Field::LlmApiKey => Value::Text(self.llm.api_key.clone()),
            Field::LlmBaseUrl => Value::Text(self.llm.base_url.clone()),
        }
    }

    /// Return a copy of this tree with exactly one leaf replaced.
    ///
    /// `self` is left untouched. The value must match the field's kind, which
    /// is always the case for values produced by [`coerce`].
    pub fn with(&self, field: Field, value: Value) -> Result<RagConfig> {
        let mut next = self.clone();
        next.set(field, value)?;
        Ok(next)
    }

    fn set(&mut self, field: Field, value: Value) -> Result<()> {
        match (field, value) {
            (Field::LoadersDirectory, Value::Text(s)) => self.loaders.directory = s,
            (Field::LoadersPattern, Value::Text(s)) => self.loaders.pattern = s,
            (Field::ChunkSize, Value::Integer(n)) => self.chunking.chunk_size = n,
            (Field::ChunkOverlap, Value::Integer(n)) => self.chunking.overlap = n,
            (Field::EmbeddingModel, Value::Text(s)) => self.embedding.model = s,
            (Field::EmbeddingApiKey, Value::Text(s)) => self.embedding.api_key = s,
            (Field::EmbeddingBaseUrl, Value::Text(s)) => self.embedding.base_url = s,
            (Field::VectorStoreType, Value::Text(s)) => self.vector_store.store_type = s,
            (Field::VectorStoreDimension, Value::Integer(n)) => self.vector_store.dimension = n,
            (Field::VectorStoreMetric, Value::Text(s)) => self.vector_store.metric = s,
            (Field::RetrievalTopK, Value::Integer(n)) => self.retrieval.top_k = n,
            (Field::RetrievalReranker, Value::OptionalText(s)) => self.retrieval.reranker = s,
            (Field::RetrievalRerankerApiKey, Value::Text(s)) => self.retrieval.reranker_api_key = s,
            (Field::RetrievalRerankerBaseUrl, Value::Text(s)) => {
                self.retrieval.reranker_base_url = s
            }
            (Field::RetrievalHybrid, Value::Boolean(b)) => self.retrieval.hybrid = b,
            (Field::LlmProvider, Value::Text(s)) => self.llm.provider = s,
            (Field::LlmModel, Value::Text(s)) => self.llm.model = s,
            (Field::LlmTemperature, Value::Float(x)) => self.llm.temperature = x,
            (Field::LlmApiKey, Value::Text(s)) => self.llm.api_key = s,
            (Field::LlmBaseUrl, Value::Text(s)) => self.llm.base_url = s,
            (field, value) => {
                return Err(RagDeckError::validation(format!(
                    "{value:?} does not match the type of {field}"
                )));
            }
        }
        Ok(())
    }
}

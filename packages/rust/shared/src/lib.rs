//! Shared types, error model, and configuration for ragdeck.
//!
//! This crate is the foundation depended on by all other ragdeck crates.
//! It provides:
//! - [`RagDeckError`]: the unified error type
//! - The configuration tree ([`RagConfig`]) and its per-field schema ([`Field`])
//! - Wire types for the `/build` and `/query` endpoints
//! - Local client settings ([`AppConfig`], settings loading)

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BackendConfig, UiConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from, validate_base_url,
};
pub use error::{ErrorKind, RagDeckError, Result};
pub use schema::{Field, FieldKind, FieldSpec, RawValue, Section, Value, coerce};
pub use types::{
    BuildLogMap, BuildResponse, ChunkingConfig, EmbeddingConfig, LlmConfig, LoadersConfig,
    Pipeline, QueryRequest, QueryResponse, QueryState, RagConfig, RetrievalConfig, SaveAck,
    VectorStoreConfig,
};

//! The backend port: the four endpoints the client depends on.
//!
//! Implementations capture everything a request needs when the method is
//! called and hand back an owned future, so callers can issue several
//! requests, keep going, and apply whichever completes first.

use std::future::Future;
use std::pin::Pin;

use ragdeck_shared::{BuildResponse, QueryRequest, QueryResponse, RagConfig, Result, SaveAck};

/// An owned, sendable future that borrows nothing from its issuer.
pub type Pending<T> = Pin<Box<dyn Future<Output = T> + Send + 'static>>;

/// A pending backend call.
pub type BackendFuture<T> = Pending<Result<T>>;

/// Contract required from the RAG backend.
pub trait Backend: Send + Sync {
    /// `GET /config`.
    fn fetch_config(&self) -> BackendFuture<RagConfig>;

    /// `POST /config` with the full tree.
    fn save_config(&self, config: &RagConfig) -> BackendFuture<SaveAck>;

    /// `POST /build` with no body.
    fn build(&self) -> BackendFuture<BuildResponse>;

    /// `POST /query`.
    fn query(&self, request: &QueryRequest) -> BackendFuture<QueryResponse>;
}

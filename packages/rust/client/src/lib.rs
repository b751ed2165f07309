//! HTTP implementation of the ragdeck backend port.
//!
//! [`HttpBackend`] talks to the RAG backend's four JSON endpoints. Every
//! failure is classified as transport (no usable response), status (non-2xx)
//! or decode (2xx with an unexpected body) so callers can tell them apart.

mod endpoint;

use std::time::Duration;

use ragdeck_core::{Backend, BackendFuture};
use ragdeck_shared::{
    AppConfig, BuildResponse, QueryRequest, QueryResponse, RagConfig, RagDeckError, Result,
    SaveAck, validate_base_url,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};
use url::Url;
use uuid::Uuid;

pub use endpoint::Endpoint;

/// User-Agent string for backend requests.
const USER_AGENT: &str = concat!("ragdeck/", env!("CARGO_PKG_VERSION"));

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest error body kept from a non-success response, in bytes.
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// HttpBackend
// ---------------------------------------------------------------------------

/// Backend reached over HTTP.
///
/// Cloning is cheap; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base: Url,
}

impl HttpBackend {
    /// Build a backend from the local settings.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let mut base = validate_base_url(config)?;
        // Url::join replaces the last segment unless the path ends in '/'.
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = build_client(config.backend.timeout_secs)?;
        info!(base = %base, "backend configured");
        Ok(Self { client, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, endpoint: Endpoint) -> Result<Url> {
        self.base.join(endpoint.path()).map_err(|e| {
            RagDeckError::config(format!("cannot join {endpoint} onto {}: {e}", self.base))
        })
    }

    fn call<T>(
        &self,
        endpoint: Endpoint,
        body: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> BackendFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let url = match self.url(endpoint) {
            Ok(url) => url,
            Err(e) => return Box::pin(std::future::ready(Err(e))),
        };
        let request_id = Uuid::now_v7();
        let request = body(
            self.client
                .request(endpoint.method(), url)
                .header(REQUEST_ID_HEADER, request_id.to_string()),
        );
        Box::pin(execute(request, endpoint, request_id))
    }
}

impl Backend for HttpBackend {
    fn fetch_config(&self) -> BackendFuture<RagConfig> {
        self.call(Endpoint::FetchConfig, |r| r)
    }

    fn save_config(&self, config: &RagConfig) -> BackendFuture<SaveAck> {
        self.call(Endpoint::SaveConfig, |r| r.json(config))
    }

    fn build(&self) -> BackendFuture<BuildResponse> {
        self.call(Endpoint::Build, |r| r)
    }

    fn query(&self, request: &QueryRequest) -> BackendFuture<QueryResponse> {
        self.call(Endpoint::Query, |r| r.json(request))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with the configured timeout.
fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RagDeckError::config(format!("failed to build HTTP client: {e}")))
}

/// Send a prepared request and decode its JSON body.
#[instrument(skip_all, fields(endpoint = %endpoint, request_id = %request_id))]
async fn execute<T: DeserializeOwned>(
    request: RequestBuilder,
    endpoint: Endpoint,
    request_id: Uuid,
) -> Result<T> {
    debug!("sending request");
    let response = request.send().await.map_err(|e| transport(endpoint, &e))?;

    let status = response.status();
    let bytes = response.bytes().await.map_err(|e| transport(endpoint, &e))?;

    if !status.is_success() {
        warn!(status = status.as_u16(), "backend rejected request");
        return Err(RagDeckError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body: truncate_body(&bytes),
        });
    }

    debug!(status = status.as_u16(), bytes = bytes.len(), "response received");
    serde_json::from_slice(&bytes)
        .map_err(|e| RagDeckError::decode(endpoint.to_string(), e.to_string()))
}

fn transport(endpoint: Endpoint, err: &reqwest::Error) -> RagDeckError {
    if err.is_timeout() {
        RagDeckError::transport(format!("{endpoint}: timed out"))
    } else {
        RagDeckError::transport(format!("{endpoint}: {err}"))
    }
}

/// Lossy UTF-8 view of an error body, cut at `MAX_ERROR_BODY` bytes.
fn truncate_body(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}

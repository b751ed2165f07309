use std::fmt;

use reqwest::Method;

/// The backend endpoints the client calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    FetchConfig,
    SaveConfig,
    Build,
    Query,
}

impl Endpoint {
    pub fn method(self) -> Method {
        match self {
            Self::FetchConfig => Method::GET,
            Self::SaveConfig | Self::Build | Self::Query => Method::POST,
        }
    }

    /// Path relative to the backend base URL.
    pub fn path(self) -> &'static str {
        match self {
            Self::FetchConfig | Self::SaveConfig => "config",
            Self::Build => "build",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} /{}", self.method(), self.path())
    }
}

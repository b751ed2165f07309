//! Component-scoped failure notices.

use chrono::{DateTime, Utc};
use ragdeck_shared::{ErrorKind, RagDeckError};

/// The latest failure a component wants the operator to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn from_error(err: &RagDeckError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
            at: Utc::now(),
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

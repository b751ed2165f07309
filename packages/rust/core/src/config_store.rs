//! The configuration store: load, leaf-granular edits, save.
//!
//! The store holds the current tree behind an `Arc`. Every edit builds a new
//! tree and swaps the `Arc`; the previous tree is never mutated, so holders of
//! an older snapshot see no change and views can detect edits with
//! [`Arc::ptr_eq`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use ragdeck_shared::{
    ErrorKind, Field, RagConfig, RagDeckError, RawValue, Result, SaveAck, Value, coerce,
};
use tracing::{debug, info, warn};

use crate::backend::{Backend, Pending};
use crate::notice::Notice;
use crate::sequence::{Disposition, Sequencer, Ticket};

/// Completed `GET /config`, ready to be applied.
#[derive(Debug)]
pub struct LoadOutcome {
    ticket: Ticket,
    /// Edit count when the load was issued.
    edits_at_issue: u64,
    result: Result<RagConfig>,
}

impl LoadOutcome {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

/// Completed `POST /config`, ready to be applied.
#[derive(Debug)]
pub struct SaveOutcome {
    ticket: Ticket,
    snapshot: Arc<RagConfig>,
    result: Result<SaveAck>,
}

impl SaveOutcome {
    pub fn ticket(&self) -> &Ticket {
        &self.ticket
    }
}

/// Whether a tree is available to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// Result of the most recent save round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    /// Nothing saved in this session yet.
    Never,
    /// A save request is outstanding.
    Saving,
    /// The backend acknowledged the save.
    Saved { at: DateTime<Utc> },
    /// The last save failed; the local tree was kept.
    Failed,
}

/// Owner of the configuration tree.
#[derive(Debug)]
pub struct ConfigStore {
    current: Option<Arc<RagConfig>>,
    /// Last tree known to match the backend (loaded or saved).
    baseline: Option<Arc<RagConfig>>,
    loads: Sequencer,
    saves: Sequencer,
    last_save: SaveStatus,
    notice: Option<Notice>,
    /// Number of edits accepted so far.
    edits: u64,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self {
            current: None,
            baseline: None,
            loads: Sequencer::new(),
            saves: Sequencer::new(),
            last_save: SaveStatus::Never,
            notice: None,
            edits: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn load_state(&self) -> LoadState {
        if self.current.is_some() {
            LoadState::Loaded
        } else if self.loads.in_flight() {
            LoadState::Loading
        } else {
            LoadState::Unloaded
        }
    }

    /// The current tree, or `None` until the initial load has completed.
    pub fn config(&self) -> Option<&RagConfig> {
        self.current.as_deref()
    }

    /// A shared handle to the current tree.
    pub fn snapshot(&self) -> Option<Arc<RagConfig>> {
        self.current.clone()
    }

    /// Read one leaf, or `None` before the initial load.
    pub fn value(&self, field: Field) -> Option<Value> {
        self.current.as_ref().map(|c| c.get(field))
    }

    /// True when local edits have not reached the backend yet.
    pub fn is_dirty(&self) -> bool {
        match (&self.current, &self.baseline) {
            (Some(current), Some(baseline)) => {
                !Arc::ptr_eq(current, baseline) && **current != **baseline
            }
            _ => false,
        }
    }

    pub fn save_status(&self) -> SaveStatus {
        if self.saves.in_flight() {
            SaveStatus::Saving
        } else {
            self.last_save
        }
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    // -----------------------------------------------------------------------
    // Load
    // -----------------------------------------------------------------------

    /// Start fetching the canonical tree.
    pub fn load(&mut self, backend: &dyn Backend) -> Pending<LoadOutcome> {
        let ticket = self.loads.issue();
        debug!(seq = ticket.seq(), "loading configuration");
        let edits_at_issue = self.edits;
        let request = backend.fetch_config();
        Box::pin(async move {
            let result = request.await;
            LoadOutcome {
                ticket,
                edits_at_issue,
                result,
            }
        })
    }

    /// Apply a completed load. A failed load leaves the store as it was.
    ///
    /// If the tree was edited after the load was issued, the edits are kept:
    /// only the baseline moves to the fetched tree, so the store stays dirty
    /// and the next save carries them.
    pub fn apply_load(&mut self, outcome: LoadOutcome) -> Disposition {
        let LoadOutcome {
            ticket,
            edits_at_issue,
            result,
        } = outcome;
        let disposition = self.loads.settle(&ticket);
        if disposition != Disposition::Applied {
            debug!(seq = ticket.seq(), %disposition, "discarding config load");
            return disposition;
        }

        match result {
            Ok(config) => {
                let tree = Arc::new(config);
                if self.current.is_some() && self.edits != edits_at_issue {
                    info!(seq = ticket.seq(), "configuration loaded; keeping newer local edits");
                } else {
                    self.current = Some(Arc::clone(&tree));
                    info!(seq = ticket.seq(), "configuration loaded");
                }
                self.baseline = Some(tree);
                self.notice = None;
            }
            Err(e) => {
                warn!(error = %e, "configuration load failed");
                self.notice = Some(Notice::from_error(&e));
            }
        }
        disposition
    }

    // -----------------------------------------------------------------------
    // Edit
    // -----------------------------------------------------------------------

    /// Replace a single leaf with `raw`, coerced to the field's declared type.
    ///
    /// Invalid input never reaches the tree: the current tree is kept and the
    /// error is both returned and recorded as the store's notice.
    pub fn update(&mut self, field: Field, raw: impl Into<RawValue>) -> Result<()> {
        let current = self.current.as_ref().ok_or(RagDeckError::Unloaded)?;

        match coerce(field, raw.into()).and_then(|value| current.with(field, value)) {
            Ok(next) => {
                self.current = Some(Arc::new(next));
                self.edits += 1;
                if self.notice.as_ref().is_some_and(|n| n.kind == ErrorKind::Validation) {
                    self.notice = None;
                }
                debug!(%field, "configuration edited");
                Ok(())
            }
            Err(e) => {
                debug!(%field, error = %e, "rejected configuration edit");
                self.notice = Some(Notice::from_error(&e));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Save
    // -----------------------------------------------------------------------

    /// Start transmitting the current tree.
    ///
    /// The tree is captured when this is called, so it contains every edit
    /// applied so far. The status stays [`SaveStatus::Saving`] until the
    /// outcome is applied.
    pub fn save(&mut self, backend: &dyn Backend) -> Result<Pending<SaveOutcome>> {
        let snapshot = self.current.clone().ok_or(RagDeckError::Unloaded)?;
        let ticket = self.saves.issue();
        debug!(seq = ticket.seq(), "saving configuration");
        let request = backend.save_config(&snapshot);
        Ok(Box::pin(async move {
            let result = request.await;
            SaveOutcome {
                ticket,
                snapshot,
                result,
            }
        }))
    }

    /// Apply a completed save. On failure the local tree is kept untouched.
    pub fn apply_save(&mut self, outcome: SaveOutcome) -> Disposition {
        let SaveOutcome {
            ticket,
            snapshot,
            result,
        } = outcome;
        let disposition = self.saves.settle(&ticket);
        if disposition != Disposition::Applied {
            debug!(seq = ticket.seq(), %disposition, "discarding config save");
            return disposition;
        }

        match result {
            Ok(_ack) => {
                self.baseline = Some(snapshot);
                self.last_save = SaveStatus::Saved { at: Utc::now() };
                self.notice = None;
                info!(seq = ticket.seq(), "configuration saved");
            }
            Err(e) => {
                warn!(error = %e, "configuration save failed");
                self.last_save = SaveStatus::Failed;
                self.notice = Some(Notice::from_error(&e));
            }
        }
        disposition
    }

    /// Detach any request still in flight; its response will be discarded.
    pub fn teardown(&mut self) {
        self.loads.teardown();
        self.saves.teardown();
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

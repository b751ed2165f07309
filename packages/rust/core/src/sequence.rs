//! Request sequencing and owner liveness.
//!
//! Every component that talks to the backend owns a [`Sequencer`] per request
//! stream. Issuing a request yields a [`Ticket`]; when the response arrives the
//! ticket is presented back to [`Sequencer::settle`], which accepts it only if
//! it is newer than anything already settled and its owner is still mounted.
//!
//! Responses can complete in any order. A response to an older request that
//! lands after a newer one has been applied is [`Disposition::Stale`]; a
//! response whose owner has been torn down, or that was issued by a different
//! instance, is [`Disposition::Detached`].

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// What happened to a response when it was presented to its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The response was the newest seen and has been applied.
    Applied,
    /// A newer response had already been applied; this one was discarded.
    Stale,
    /// The owner was torn down or is a different instance; discarded.
    Detached,
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Applied => write!(f, "applied"),
            Self::Stale => write!(f, "stale"),
            Self::Detached => write!(f, "detached"),
        }
    }
}

/// Shared flag that is true while the owning component is mounted.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Whether the owner is still mounted.
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn revoke(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn same_owner(&self, other: &Liveness) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Identifies one issued request.
#[derive(Debug, Clone)]
pub struct Ticket {
    seq: u64,
    owner: Liveness,
}

impl Ticket {
    /// Monotonic sequence number within the issuing stream.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Whether the issuing component is still mounted.
    ///
    /// Cheap to check from a spawned task before handing the response back.
    pub fn is_live(&self) -> bool {
        self.owner.is_alive()
    }
}

/// Issues tickets and decides which responses may be applied.
#[derive(Debug)]
pub struct Sequencer {
    issued: u64,
    settled: u64,
    owner: Liveness,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            issued: 0,
            settled: 0,
            owner: Liveness::new(),
        }
    }

    /// Issue a ticket for a new request.
    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket {
            seq: self.issued,
            owner: self.owner.clone(),
        }
    }

    /// Decide whether the response for `ticket` may be applied, recording it if so.
    pub fn settle(&mut self, ticket: &Ticket) -> Disposition {
        if !self.owner.same_owner(&ticket.owner) || !self.owner.is_alive() {
            return Disposition::Detached;
        }
        if ticket.seq <= self.settled {
            return Disposition::Stale;
        }
        self.settled = ticket.seq;
        Disposition::Applied
    }

    /// True while the most recently issued request has not settled.
    pub fn in_flight(&self) -> bool {
        self.issued > self.settled
    }

    /// Mark the owner as torn down. Any response still in flight will be detached.
    pub fn teardown(&mut self) {
        self.owner.revoke();
    }

    pub fn is_alive(&self) -> bool {
        self.owner.is_alive()
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.owner.revoke();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_response_wins_when_it_arrives_first() {
        let mut seq = Sequencer::new();
        let first = seq.issue();
        let second = seq.issue();
        assert!(seq.in_flight());

        assert_eq!(seq.settle(&second), Disposition::Applied);
        assert_eq!(seq.settle(&first), Disposition::Stale);
        assert!(!seq.in_flight());
    }

    #[test]
    fn in_order_responses_are_all_applied() {
        let mut seq = Sequencer::new();
        let first = seq.issue();
        let second = seq.issue();

        assert_eq!(seq.settle(&first), Disposition::Applied);
        assert!(seq.in_flight(), "second request still outstanding");
        assert_eq!(seq.settle(&second), Disposition::Applied);
        assert!(!seq.in_flight());
    }

    #[test]
    fn a_ticket_settles_once() {
        let mut seq = Sequencer::new();
        let t = seq.issue();
        assert_eq!(seq.settle(&t), Disposition::Applied);
        assert_eq!(seq.settle(&t), Disposition::Stale);
    }

    #[test]
    fn teardown_detaches_in_flight_tickets() {
        let mut seq = Sequencer::new();
        let t = seq.issue();
        assert!(t.is_live());

        seq.teardown();
        assert!(!t.is_live());
        assert_eq!(seq.settle(&t), Disposition::Detached);
    }

    #[test]
    fn dropping_the_owner_revokes_liveness() {
        let ticket = {
            let mut owner = Sequencer::new();
            owner.issue()
        };
        assert!(!ticket.is_live());
    }

    #[test]
    fn tickets_from_another_instance_are_detached() {
        let mut old = Sequencer::new();
        let mut fresh = Sequencer::new();
        let t = old.issue();
        fresh.issue();

        assert_eq!(fresh.settle(&t), Disposition::Detached);
        assert!(fresh.in_flight());
    }
}

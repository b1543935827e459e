//! Concurrent store of in-flight and historical hedges.
//!
//! An atomic check-and-mark (`DashMap` entry API, no TOCTOU window) backs
//! the idempotency guard the Hedge Lifecycle Manager's open step requires:
//! two arbitrage opportunities resolving to the same key must never both
//! result in an open. Hedges open, monitor and close on a seconds-to-minutes
//! cadence, so a single `DashMap<HedgeKey, RwLock<Hedge>>` is the right
//! amount of machinery here.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use hedge_core::{Hedge, HedgeKey, HedgeState};
use parking_lot::RwLock;

use crate::error::{PositionError, PositionResult};

/// Outcome of `try_open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// No record existed (or the prior one was terminal); a fresh
    /// `Opening` record was inserted and the caller should proceed.
    Inserted,
    /// A non-terminal record already occupies this key; the caller must
    /// return without action (spec's idempotency guarantee).
    AlreadyInFlight,
}

/// Concurrent, keyed store of hedges.
#[derive(Default)]
pub struct HedgeTracker {
    hedges: DashMap<HedgeKey, RwLock<Hedge>>,
}

impl HedgeTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically inserts a fresh `Opening` record unless one already
    /// occupies `key` in a non-terminal state. A terminal record is
    /// overwritten — table rows are not reused across lifecycles.
    pub fn try_open(&self, hedge: Hedge) -> OpenOutcome {
        match self.hedges.entry(hedge.key.clone()) {
            Entry::Vacant(vacant) => {
                vacant.insert(RwLock::new(hedge));
                OpenOutcome::Inserted
            }
            Entry::Occupied(mut occupied) => {
                let is_terminal = occupied.get().read().state.is_terminal();
                if is_terminal {
                    occupied.insert(RwLock::new(hedge));
                    OpenOutcome::Inserted
                } else {
                    OpenOutcome::AlreadyInFlight
                }
            }
        }
    }

    #[must_use]
    pub fn get(&self, key: &HedgeKey) -> Option<Hedge> {
        self.hedges.get(key).map(|r| r.read().clone())
    }

    /// Applies `f` to the hedge under `key` while holding the write lock.
    pub fn update<F>(&self, key: &HedgeKey, f: F) -> PositionResult<()>
    where
        F: FnOnce(&mut Hedge),
    {
        let entry = self
            .hedges
            .get(key)
            .ok_or_else(|| PositionError::NotFound(key.to_string()))?;
        f(&mut entry.write());
        Ok(())
    }

    /// Transitions `key` from `from` to `to`, failing if the current state
    /// does not match `from` (guards against racing transitions).
    pub fn transition(&self, key: &HedgeKey, from: HedgeState, to: HedgeState) -> PositionResult<()> {
        let entry = self
            .hedges
            .get(key)
            .ok_or_else(|| PositionError::NotFound(key.to_string()))?;
        let mut guard = entry.write();
        if guard.state != from {
            return Err(PositionError::InvalidTransition {
                key: key.to_string(),
                from: guard.state,
                to,
            });
        }
        guard.state = to;
        Ok(())
    }

    /// Snapshot of every hedge currently in state `Active`, the monitor
    /// loop's working set.
    #[must_use]
    pub fn active(&self) -> Vec<Hedge> {
        self.hedges
            .iter()
            .filter_map(|r| {
                let hedge = r.read();
                (hedge.state == HedgeState::Active).then(|| hedge.clone())
            })
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> Vec<Hedge> {
        self.hedges.iter().map(|r| r.read().clone()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hedges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hedges.is_empty()
    }
}

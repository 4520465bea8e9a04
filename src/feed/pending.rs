//! Registry of in-flight optimistic interaction changes.

use super::post::{InteractionKind, InteractionOverride};
use crate::api::PostId;
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Monotonically increasing id assigned to each optimistic mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MutationId(u64);

impl MutationId {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub id: MutationId,
    pub post_id: PostId,
    pub kind: InteractionKind,
    /// State to restore if this mutation fails while it is the latest one.
    pub snapshot: InteractionOverride,
    pub submitted_at: Instant,
}

/// What the caller should do with a failed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureResolution {
    /// Latest mutation for its post and kind: put this state back.
    Restore(InteractionOverride),
    /// A newer mutation already shows the user's latest intent; leave the UI alone.
    Superseded,
    /// Not tracked (already resolved, or cleared by a reload).
    Unknown,
}

type MutationKey = (PostId, InteractionKind);

/// Optimistic mutations whose network call has not resolved yet.
///
/// Each mutation moves `Applied -> Confirmed` or `Applied -> RolledBack`.
/// Responses may arrive out of order; ids decide which snapshot wins.
pub struct PendingMutationRegistry {
    pending: BTreeMap<MutationId, PendingMutation>,
    latest: HashMap<MutationKey, MutationId>,
    next_id: u64,
}

impl Default for PendingMutationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingMutationRegistry {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            latest: HashMap::new(),
            next_id: 0,
        }
    }

    /// Record an applied mutation and return its id.
    pub fn register(&mut self, post_id: PostId, kind: InteractionKind, snapshot: InteractionOverride) -> MutationId {
        self.next_id += 1;
        let id = MutationId(self.next_id);
        self.latest.insert((post_id.clone(), kind), id);
        self.pending.insert(
            id,
            PendingMutation {
                id,
                post_id,
                kind,
                snapshot,
                submitted_at: Instant::now(),
            },
        );
        id
    }

    pub fn get(&self, id: MutationId) -> Option<&PendingMutation> {
        self.pending.get(&id)
    }

    /// The server accepted the mutation.
    pub fn confirm(&mut self, id: MutationId) -> Option<PendingMutation> {
        self.pending.remove(&id)
    }

    /// The server call failed. If a newer mutation on the same post and kind
    /// is still pending, it inherits this snapshot so that its own failure
    /// would restore the state from before both.
    pub fn fail(&mut self, id: MutationId) -> FailureResolution {
        let Some(failed) = self.pending.remove(&id) else {
            return FailureResolution::Unknown;
        };
        let key = (failed.post_id.clone(), failed.kind);
        if self.latest.get(&key) == Some(&id) {
            return FailureResolution::Restore(failed.snapshot);
        }

        let newer = self
            .pending
            .range_mut(MutationId(id.0 + 1)..)
            .map(|(_, m)| m)
            .find(|m| m.post_id == failed.post_id && m.kind == failed.kind);
        if let Some(next) = newer {
            next.snapshot = failed.snapshot;
        }
        FailureResolution::Superseded
    }

    pub fn is_pending(&self, post_id: &PostId, kind: InteractionKind) -> bool {
        self.pending
            .values()
            .any(|m| &m.post_id == post_id && m.kind == kind)
    }

    /// Age of the oldest unresolved mutation.
    pub fn oldest_age(&self) -> Option<Duration> {
        self.pending.values().next().map(|m| m.submitted_at.elapsed())
    }

    /// Forget everything. Used when a reload replaces the overrides, so late
    /// responses resolve as `Unknown`.
    pub fn drain(&mut self) -> Vec<PendingMutation> {
        self.latest.clear();
        std::mem::take(&mut self.pending).into_values().collect()
    }

    pub fn count(&self) -> usize {
        self.pending.len()
    }
}

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::domain::ParticipantId;

/// Per-participant mutual exclusion around check-then-commit.
///
/// Locks are taken in sorted id order so overlapping participant sets cannot deadlock.
/// Guards are owned, so dropping the returned value (including when the owning future is
/// cancelled) releases every lock.
#[derive(Debug, Default)]
pub struct ParticipantLocks {
    slots: Mutex<HashMap<ParticipantId, Arc<AsyncMutex<()>>>>,
}

pub struct ParticipantGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ParticipantLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire<'a, I>(&self, participants: I) -> ParticipantGuard
    where
        I: IntoIterator<Item = &'a ParticipantId>,
    {
        let mut ids: Vec<ParticipantId> = participants.into_iter().cloned().collect();
        ids.sort();
        ids.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            ids.into_iter()
                .map(|id| Arc::clone(slots.entry(id).or_default()))
                .collect()
        };

        let mut guards = Vec::with_capacity(mutexes.len());
        for mutex in mutexes {
            guards.push(mutex.lock_owned().await);
        }
        ParticipantGuard { _guards: guards }
    }
}

//! Per-owner ongoing-task bookkeeping

use super::locate_task::TaskCanceller;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

/// What to do when an owner asks for a second locate while one is ongoing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlapPolicy {
    /// Refuse the new request; the running task is untouched
    #[default]
    Reject,
    /// Cancel the running task and start the new one
    Supersede,
}

struct Slot {
    generation: u64,
    canceller: Option<TaskCanceller>,
}

/// Tracks which owners have a locate in flight
///
/// All methods are safe to call from any thread.
pub struct TaskRegistry<K> {
    slots: Mutex<HashMap<K, Slot>>,
    policy: OverlapPolicy,
    next_generation: AtomicU64,
}

impl<K> TaskRegistry<K>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
{
    pub fn new(policy: OverlapPolicy) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            policy,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Mark `token` as ongoing. Returns false if the request is rejected.
    pub fn begin(&self, token: K) -> bool {
        self.try_begin(token).is_some()
    }

    /// Clear the ongoing flag for `token`. Returns false if it was not set.
    pub fn end(&self, token: &K) -> bool {
        self.lock().remove(token).is_some()
    }

    pub fn is_ongoing(&self, token: &K) -> bool {
        self.lock().contains_key(token)
    }

    pub fn ongoing_count(&self) -> usize {
        self.lock().len()
    }

    /// Mark `token` as ongoing and return a guard that clears it on drop
    pub fn reserve(self: &Arc<Self>, token: K) -> Option<OngoingGuard<K>> {
        let generation = self.try_begin(token.clone())?;
        Some(OngoingGuard {
            registry: Arc::clone(self),
            token,
            generation,
        })
    }

    fn try_begin(&self, token: K) -> Option<u64> {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut slots = self.lock();

        if !slots.contains_key(&token) {
            slots.insert(
                token,
                Slot {
                    generation,
                    canceller: None,
                },
            );
            return Some(generation);
        }

        if self.policy == OverlapPolicy::Reject {
            debug!(owner = %token, "Locate already ongoing, rejecting request");
            return None;
        }

        let superseded = slots
            .insert(
                token.clone(),
                Slot {
                    generation,
                    canceller: None,
                },
            )
            .and_then(|previous| previous.canceller);
        drop(slots);

        debug!(owner = %token, "Superseding ongoing locate");
        if let Some(canceller) = superseded {
            canceller.cancel();
        }
        Some(generation)
    }

    fn bind(&self, token: &K, generation: u64, canceller: TaskCanceller) {
        let superseded = match self.lock().get_mut(token) {
            Some(slot) if slot.generation == generation => {
                slot.canceller = Some(canceller);
                None
            }
            _ => Some(canceller),
        };

        // Replaced before the task was bound; nobody else will cancel it
        if let Some(canceller) = superseded {
            debug!(owner = %token, "Locate superseded before binding, cancelling");
            canceller.cancel();
        }
    }

    fn end_generation(&self, token: &K, generation: u64) -> bool {
        let mut slots = self.lock();
        match slots.get(token) {
            Some(slot) if slot.generation == generation => {
                slots.remove(token);
                true
            }
            _ => false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Slot>> {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Clears an owner's ongoing flag when dropped
///
/// A guard only clears the flag it set, so a superseded task finishing late
/// never clears the flag of the task that replaced it.
pub struct OngoingGuard<K>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
{
    registry: Arc<TaskRegistry<K>>,
    token: K,
    generation: u64,
}

impl<K> OngoingGuard<K>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
{
    pub fn token(&self) -> &K {
        &self.token
    }

    /// Record the task holding this slot, so a superseding request can cancel it
    pub fn bind(&self, canceller: TaskCanceller) {
        self.registry.bind(&self.token, self.generation, canceller);
    }
}

impl<K> Drop for OngoingGuard<K>
where
    K: Eq + Hash + Clone + Display + Send + 'static,
{
    fn drop(&mut self) {
        if self.registry.end_generation(&self.token, self.generation) {
            debug!(owner = %self.token, "Locate no longer ongoing");
        }
    }
}

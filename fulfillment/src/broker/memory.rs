//! In-process broker implementation
//!
//! One mutex guards all broker state, so every trait call — including the
//! compound operations — executes as a single indivisible step, matching the
//! single-threaded execution model of the production broker.

use super::DispatchBroker;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared::error::AppResult;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<String>>,
    sets: HashMap<String, HashSet<String>>,
    counters: HashMap<String, Counter>,
}

struct Counter {
    value: u64,
    expires_at: Instant,
}

/// In-process [`DispatchBroker`]
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a queue's contents, head first (test inspection)
    pub fn queue_snapshot(&self, queue: &str) -> Vec<String> {
        let state = self.state.lock();
        state
            .queues
            .get(queue)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DispatchBroker for MemoryBroker {
    async fn queue_push(&self, queue: &str, value: &str) -> AppResult<()> {
        let mut state = self.state.lock();
        state
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(value.to_string());
        Ok(())
    }

    async fn queue_pop(&self, queue: &str) -> AppResult<Option<String>> {
        let mut state = self.state.lock();
        Ok(state.queues.get_mut(queue).and_then(|q| q.pop_front()))
    }

    async fn queue_remove(&self, queue: &str, value: &str) -> AppResult<bool> {
        let mut state = self.state.lock();
        let Some(q) = state.queues.get_mut(queue) else {
            return Ok(false);
        };
        let before = q.len();
        q.retain(|v| v != value);
        Ok(q.len() < before)
    }

    async fn queue_len(&self, queue: &str) -> AppResult<usize> {
        let state = self.state.lock();
        Ok(state.queues.get(queue).map(|q| q.len()).unwrap_or(0))
    }

    async fn set_add(&self, set: &str, member: &str) -> AppResult<bool> {
        let mut state = self.state.lock();
        Ok(state
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, set: &str, member: &str) -> AppResult<bool> {
        let mut state = self.state.lock();
        Ok(state
            .sets
            .get_mut(set)
            .map(|s| s.remove(member))
            .unwrap_or(false))
    }

    async fn set_contains(&self, set: &str, member: &str) -> AppResult<bool> {
        let state = self.state.lock();
        Ok(state
            .sets
            .get(set)
            .map(|s| s.contains(member))
            .unwrap_or(false))
    }

    async fn set_members(&self, set: &str) -> AppResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .sets
            .get(set)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn pop_idle_driver(&self, queue: &str, busy: &str) -> AppResult<Option<String>> {
        let mut state = self.state.lock();
        let Some(member) = state.queues.get_mut(queue).and_then(|q| q.pop_front()) else {
            return Ok(None);
        };
        let busy_set = state.sets.entry(busy.to_string()).or_default();
        if busy_set.contains(&member) {
            // Stale queue entry; the driver is already serving a delivery
            return Ok(None);
        }
        busy_set.insert(member.clone());
        Ok(Some(member))
    }

    async fn enlist_driver(
        &self,
        queue: &str,
        busy: &str,
        shift: &str,
        member: &str,
    ) -> AppResult<bool> {
        let mut state = self.state.lock();
        state
            .sets
            .entry(shift.to_string())
            .or_default()
            .insert(member.to_string());
        let is_busy = state
            .sets
            .get(busy)
            .map(|s| s.contains(member))
            .unwrap_or(false);
        let q = state.queues.entry(queue.to_string()).or_default();
        if is_busy || q.iter().any(|v| v == member) {
            return Ok(false);
        }
        q.push_back(member.to_string());
        Ok(true)
    }

    async fn claim_driver(&self, queue: &str, busy: &str, member: &str) -> AppResult<()> {
        let mut state = self.state.lock();
        if let Some(q) = state.queues.get_mut(queue) {
            q.retain(|v| v != member);
        }
        state
            .sets
            .entry(busy.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn counter_incr(&self, key: &str, ttl: Duration) -> AppResult<u64> {
        let mut state = self.state.lock();
        let now = Instant::now();
        let counter = state
            .counters
            .entry(key.to_string())
            .and_modify(|c| {
                if c.expires_at <= now {
                    c.value = 0;
                    c.expires_at = now + ttl;
                }
            })
            .or_insert(Counter {
                value: 0,
                expires_at: now + ttl,
            });
        counter.value += 1;
        Ok(counter.value)
    }
}

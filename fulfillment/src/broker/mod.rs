//! Dispatch broker abstraction
//!
//! Driver availability is coordinated through an external atomic
//! key-value/queue service so that any number of service instances share one
//! source of truth. The trait exposes plain FIFO/set primitives plus three
//! compound operations; each compound call is a single indivisible state
//! transition on the broker side, never a read-then-write pair from the
//! caller.
//!
//! ```text
//!         ┌──────────────────────┐
//!         │ DispatchBroker trait │  ◄── pluggable interface
//!         └──────────┬───────────┘
//!                    │
//!                    ▼
//!              MemoryBroker
//!            (single-mutex, in-process)
//! ```

mod memory;

pub use memory::MemoryBroker;

use async_trait::async_trait;
use shared::error::AppResult;
use std::time::Duration;

/// FIFO queue of driver ids awaiting an assignment (oldest-waiting first)
pub const AVAILABLE_QUEUE: &str = "dispatch:available";

/// Set of driver ids currently serving an out-for-delivery order
pub const BUSY_SET: &str = "dispatch:busy";

/// Set of driver ids on duty, whether busy or available
pub const SHIFT_SET: &str = "dispatch:shift";

/// FIFO queue of order ids that became ready while no driver was available
pub const IDLE_ORDERS_QUEUE: &str = "dispatch:idle_orders";

/// Expiring attempt counter for delivery verification of one order
pub fn verify_attempts_key(order_id: &str) -> String {
    format!("dispatch:verify_attempts:{order_id}")
}

/// Atomic queue/set/counter service used for driver coordination
#[async_trait]
pub trait DispatchBroker: Clone + Send + Sync + 'static {
    /// Append a value to the tail of a FIFO queue
    async fn queue_push(&self, queue: &str, value: &str) -> AppResult<()>;

    /// Pop the head of a FIFO queue
    async fn queue_pop(&self, queue: &str) -> AppResult<Option<String>>;

    /// Remove a value from anywhere in a queue; returns whether it was present
    async fn queue_remove(&self, queue: &str, value: &str) -> AppResult<bool>;

    /// Current queue length
    async fn queue_len(&self, queue: &str) -> AppResult<usize>;

    /// Add a member to a set; returns whether it was newly added
    async fn set_add(&self, set: &str, member: &str) -> AppResult<bool>;

    /// Remove a member from a set; returns whether it was present
    async fn set_remove(&self, set: &str, member: &str) -> AppResult<bool>;

    /// Set membership check
    async fn set_contains(&self, set: &str, member: &str) -> AppResult<bool>;

    /// All members of a set
    async fn set_members(&self, set: &str) -> AppResult<Vec<String>>;

    /// Compound atomic assignment step: pop the head of `queue`; if the
    /// popped id is already in `busy` (stale entry) discard it and return
    /// `None`; otherwise add it to `busy` and return it. Never re-inserts
    /// into `queue` while also adding to `busy`.
    async fn pop_idle_driver(&self, queue: &str, busy: &str) -> AppResult<Option<String>>;

    /// Compound atomic shift-join insertion: add `member` to `shift`, and to
    /// the tail of `queue` unless it is already queued or in `busy`.
    /// Returns whether the member was enqueued.
    async fn enlist_driver(
        &self,
        queue: &str,
        busy: &str,
        shift: &str,
        member: &str,
    ) -> AppResult<bool>;

    /// Compound atomic available→busy move for an explicit order acceptance;
    /// idempotent when the member is already busy.
    async fn claim_driver(&self, queue: &str, busy: &str, member: &str) -> AppResult<()>;

    /// Increment an expiring counter and return the new value. The counter
    /// resets once `ttl` has elapsed since its first increment.
    async fn counter_incr(&self, key: &str, ttl: Duration) -> AppResult<u64>;
}

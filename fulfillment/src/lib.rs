//! Order-fulfillment dispatch core
//!
//! The subsystem that moves orders from `READY` to a customer's door:
//! the order status state machine with compensating side effects
//! ([`lifecycle`]), the driver shift/assignment engine built on atomic
//! broker primitives ([`dispatch`], [`broker`]), and the use-case
//! orchestration layer the API calls ([`coordinator`]).
//!
//! Persistence ([`store`]) and driver coordination state are separate on
//! purpose: stock/coupon/points mutations commit atomically with the order
//! status in one store transaction, while driver availability lives in the
//! dispatch broker so any number of service instances share one source of
//! truth.

pub mod attachments;
pub mod broker;
pub mod coordinator;
pub mod dispatch;
pub mod lifecycle;
pub mod store;
pub mod verification;

#[cfg(test)]
mod tests;

// Re-exports
pub use attachments::{AttachmentStore, LocalAttachmentStore};
pub use broker::{DispatchBroker, MemoryBroker};
pub use coordinator::FulfillmentCoordinator;
pub use dispatch::notifier::{DriverNotifier, SessionNotifier};
pub use dispatch::reconciler::BusyDriverReconciler;
pub use dispatch::DispatchEngine;
pub use lifecycle::{CompensationPlan, OrderLifecycle, StatusChange};
pub use store::{FulfillmentStore, StoreError};

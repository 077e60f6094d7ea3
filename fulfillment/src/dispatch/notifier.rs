//! Driver push notifications
//!
//! Assignment notices are delivered best-effort to the driver's connected
//! client session. The session registry is per-instance and never
//! authoritative for assignment decisions; an offline driver simply misses
//! the push and sees the order on the next shift-status fetch.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::ReadyOrderNotice;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Push channel to currently-connected driver sessions
///
/// At-most-once, fire-and-forget: a send to an offline driver is dropped.
#[async_trait]
pub trait DriverNotifier: Clone + Send + Sync + 'static {
    async fn notify(&self, driver_id: i64, notice: ReadyOrderNotice);
}

/// Per-instance registry of connected driver sessions
#[derive(Clone, Default)]
pub struct SessionNotifier {
    sessions: Arc<DashMap<i64, mpsc::UnboundedSender<ReadyOrderNotice>>>,
}

impl SessionNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver session, returning its notice stream.
    /// A reconnect replaces the previous session (latest wins).
    pub fn connect(&self, driver_id: i64) -> mpsc::UnboundedReceiver<ReadyOrderNotice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.sessions.insert(driver_id, tx);
        rx
    }

    /// Drop a driver session
    pub fn disconnect(&self, driver_id: i64) {
        self.sessions.remove(&driver_id);
    }
}

#[async_trait]
impl DriverNotifier for SessionNotifier {
    async fn notify(&self, driver_id: i64, notice: ReadyOrderNotice) {
        match self.sessions.get(&driver_id) {
            Some(session) => {
                if session.send(notice).is_err() {
                    tracing::debug!(driver_id, "Driver session closed, notice dropped");
                }
            }
            None => {
                tracing::debug!(driver_id, "Driver offline, notice dropped");
            }
        }
    }
}

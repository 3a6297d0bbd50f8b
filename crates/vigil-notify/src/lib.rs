//! Alert publishing.
//!
//! The engine hands finished [`AlertRecord`]s to a sink; the daemon also
//! sends one heartbeat per completed check cycle so the receiving side can
//! detect a stalled poller. The webhook sink posts JSON to an HTTP endpoint
//! with retries; the console sink just logs, which is useful when trying
//! out rule files.

pub mod console;
pub mod error;
pub mod webhook;

use async_trait::async_trait;
use vigil_common::types::{AlertRecord, Heartbeat};

pub use console::ConsoleSink;
pub use error::NotifyError;
pub use webhook::WebhookSink;

/// Destination for alerts and liveness heartbeats.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn send_alert(&self, alert: &AlertRecord) -> Result<(), NotifyError>;

    async fn send_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), NotifyError>;
}

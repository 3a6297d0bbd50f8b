use async_trait::async_trait;
use vigil_common::types::{AlertRecord, Heartbeat};

use crate::error::NotifyError;
use crate::AlertSink;

/// Logs alerts instead of delivering them. Useful for trying out a rule
/// file against a live metric source.
pub struct ConsoleSink;

#[async_trait]
impl AlertSink for ConsoleSink {
    async fn send_alert(&self, alert: &AlertRecord) -> Result<(), NotifyError> {
        tracing::info!(
            resource = %alert.resource,
            event = %alert.event,
            severity = %alert.severity,
            value = %alert.value,
            text = %alert.text,
            "ALERT"
        );
        Ok(())
    }

    async fn send_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), NotifyError> {
        tracing::debug!(origin = %heartbeat.origin, "Heartbeat");
        Ok(())
    }
}

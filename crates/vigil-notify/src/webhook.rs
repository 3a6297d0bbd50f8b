use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use vigil_common::types::{AlertRecord, Heartbeat};

use crate::error::NotifyError;
use crate::AlertSink;

const MAX_ATTEMPTS: u32 = 3;

/// Posts alerts and heartbeats as JSON to an HTTP endpoint.
///
/// Transient failures are retried with exponential backoff; a delivery
/// that still fails after the last attempt surfaces as an error and the
/// daemon moves on to the next alert.
pub struct WebhookSink {
    client: reqwest::Client,
    alert_url: String,
    heartbeat_url: String,
}

impl WebhookSink {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            alert_url: format!("{base}/api/v1/alerts"),
            heartbeat_url: format!("{base}/api/v1/heartbeats"),
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, payload: &T) -> Result<(), NotifyError> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.client.post(url).json(payload).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(());
                    }
                    let body = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = status.as_u16(),
                        "Endpoint returned non-success status, retrying"
                    );
                    last_err = Some(NotifyError::ApiError {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Post failed, retrying");
                    last_err = Some(e.into());
                }
            }
            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
            }
        }
        Err(last_err.unwrap_or(NotifyError::ApiError {
            status: 0,
            body: String::new(),
        }))
    }
}

#[async_trait]
impl AlertSink for WebhookSink {
    async fn send_alert(&self, alert: &AlertRecord) -> Result<(), NotifyError> {
        self.post(&self.alert_url, alert).await
    }

    async fn send_heartbeat(&self, heartbeat: &Heartbeat) -> Result<(), NotifyError> {
        self.post(&self.heartbeat_url, heartbeat).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use vigil_common::types::Severity;

    #[test]
    fn derives_endpoint_urls_from_the_base() {
        let sink = WebhookSink::new("http://alerts.example.com/", 10).unwrap();
        assert_eq!(sink.alert_url, "http://alerts.example.com/api/v1/alerts");
        assert_eq!(
            sink.heartbeat_url,
            "http://alerts.example.com/api/v1/heartbeats"
        );
    }

    #[test]
    fn alert_body_carries_the_documented_fields() {
        let alert = AlertRecord {
            id: "a1".to_string(),
            resource: "web01".to_string(),
            event: "HighLoad".to_string(),
            group: "OS".to_string(),
            value: "7.5".to_string(),
            severity: Severity::Major,
            environment: vec!["PROD".to_string()],
            service: vec!["Website".to_string()],
            text: "Load average is 7.5".to_string(),
            event_type: "metricAlert".to_string(),
            tags: vec!["os".to_string(), "cluster:web".to_string()],
            threshold_info: "major:>:5,normal:<=:5".to_string(),
            more_info: "http://g/ganglia/?c=web&h=web01".to_string(),
            graph_urls: vec!["http://g/ganglia/graph.php?m=load_one".to_string()],
            timestamp: Utc::now(),
        };

        let body = serde_json::to_value(&alert).unwrap();
        assert_eq!(body["resource"], "web01");
        assert_eq!(body["event"], "HighLoad");
        assert_eq!(body["severity"], "major");
        assert_eq!(body["value"], "7.5");
        assert_eq!(body["event_type"], "metricAlert");
        assert_eq!(body["threshold_info"], "major:>:5,normal:<=:5");
        assert_eq!(body["environment"][0], "PROD");
        assert_eq!(body["tags"][1], "cluster:web");
        assert_eq!(body["graph_urls"][0], "http://g/ganglia/graph.php?m=load_one");
        assert_eq!(body["more_info"], "http://g/ganglia/?c=web&h=web01");
        assert!(body["timestamp"].is_string());
    }

    #[test]
    fn heartbeat_body_carries_origin_and_version() {
        let heartbeat = Heartbeat::new("vigil-daemon", "0.1.0");
        let body = serde_json::to_value(&heartbeat).unwrap();
        assert_eq!(body["origin"], "vigil-daemon");
        assert_eq!(body["version"], "0.1.0");
        assert!(body["id"].is_string());
        assert!(body["timestamp"].is_string());
    }
}

use std::time::Duration;

use async_trait::async_trait;
use vigil_common::types::{MetricResponse, MetricSample};
use vigil_rules::MetricQuery;

use crate::error::SourceError;
use crate::MetricSource;

/// REST client for a gmetad-style metric endpoint.
pub struct HttpMetricSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpMetricSource {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

fn metrics_url(base_url: &str, query: &MetricQuery) -> String {
    format!("{base_url}/api/v1/metrics?{}", query.to_query_string())
}

#[async_trait]
impl MetricSource for HttpMetricSource {
    async fn fetch(&self, query: &MetricQuery) -> Result<Vec<MetricSample>, SourceError> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let url = metrics_url(&self.base_url, query);
        tracing::debug!(url = %url, "Requesting metrics");

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::BadStatus {
                status: status.as_u16(),
                url,
            });
        }

        let body: MetricResponse = resp.json().await?;
        if body.status != "ok" {
            return Err(SourceError::ErrorStatus(
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }

        tracing::debug!(
            total = body.total,
            returned = body.metrics.len(),
            time = body.time,
            "Metrics received"
        );
        Ok(body.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(metrics: &[&str], filter: Option<&str>) -> MetricQuery {
        MetricQuery {
            metrics: metrics.iter().map(|m| m.to_string()).collect(),
            filter: filter.map(|f| f.to_string()),
        }
    }

    #[test]
    fn builds_the_metrics_url() {
        let q = query(&["load_one", "cpu_user"], None);
        assert_eq!(
            metrics_url("http://gmetad:8080", &q),
            "http://gmetad:8080/api/v1/metrics?metric=cpu_user&metric=load_one"
        );
    }

    #[test]
    fn filter_precedes_metric_params() {
        let q = query(&["load_one"], Some("cluster=web"));
        assert_eq!(
            metrics_url("http://gmetad:8080", &q),
            "http://gmetad:8080/api/v1/metrics?cluster=web&metric=load_one"
        );
    }

    #[test]
    fn strips_trailing_slash_from_base_url() {
        let source = HttpMetricSource::new("http://gmetad:8080/", 15).unwrap();
        assert_eq!(source.base_url, "http://gmetad:8080");
    }

    #[test]
    fn parses_a_metric_response() {
        let body = r#"{
            "status": "ok",
            "total": 1,
            "time": 0.042,
            "metrics": [{
                "id": "web01:load_one",
                "metric": "load_one",
                "value": "0.53",
                "units": "",
                "type": "float",
                "host": "web01",
                "cluster": "web",
                "environment": "PROD",
                "service": "Website",
                "graphUrl": "http://g/ganglia/graph.php?m=load_one"
            }]
        }"#;
        let resp: MetricResponse = serde_json::from_str(body).unwrap();
        assert_eq!(resp.status, "ok");
        assert_eq!(resp.metrics.len(), 1);
        assert_eq!(resp.metrics[0].host.as_deref(), Some("web01"));
        assert_eq!(resp.metrics[0].value.as_deref(), Some("0.53"));
    }
}

//! Metric acquisition.
//!
//! Each check cycle asks the source for exactly the metrics a rule needs,
//! expressed as a [`MetricQuery`]. The HTTP implementation talks to a
//! gmetad-style REST endpoint; anything that can answer a query with
//! samples can stand in behind the [`MetricSource`] trait.

pub mod error;
pub mod http;

use async_trait::async_trait;
use vigil_common::types::MetricSample;
use vigil_rules::MetricQuery;

pub use error::SourceError;
pub use http::HttpMetricSource;

/// Something that can answer a metric query with a batch of samples.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch(&self, query: &MetricQuery) -> Result<Vec<MetricSample>, SourceError>;
}

use std::collections::BTreeSet;

use crate::rule::Rule;

/// The set of metrics a rule needs from the metric source, plus the rule's
/// optional verbatim filter.
///
/// Metric names are collected from the rule's texts, threshold bounds, and
/// value expression; every placeholder except `$now` counts. The set is kept
/// sorted so the resulting query string is identical across runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    pub metrics: BTreeSet<String>,
    pub filter: Option<String>,
}

impl MetricQuery {
    pub fn for_rule(rule: &Rule) -> Self {
        let mut metrics = BTreeSet::new();
        for text in &rule.texts {
            metrics.extend(text.metric_names().map(str::to_string));
        }
        for threshold in &rule.thresholds {
            metrics.extend(threshold.bound.metric_names().map(str::to_string));
        }
        metrics.extend(rule.value.metric_names().map(str::to_string));
        Self {
            metrics,
            filter: rule.filter.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty() && self.filter.is_none()
    }

    /// Deterministic query-string rendering: the filter first, then one
    /// `metric=<name>` parameter per required metric in sorted order.
    pub fn to_query_string(&self) -> String {
        let mut params: Vec<String> = Vec::with_capacity(self.metrics.len() + 1);
        if let Some(filter) = &self.filter {
            params.push(filter.clone());
        }
        params.extend(self.metrics.iter().map(|m| format!("metric={m}")));
        params.join("&")
    }
}

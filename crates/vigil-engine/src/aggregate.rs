//! Per-resource aggregation.
//!
//! Groups a rule's metric samples by resolved resource name and builds one
//! accumulator per resource: an independent mutable copy of the rule's
//! thresholds and texts with metric values substituted in, plus the merged
//! environment, service, tags, and graph links.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use vigil_common::types::MetricSample;
use vigil_rules::{ResourceField, Rule, Template, Threshold, UNRESOLVED};

/// Rule templates with `$now` substituted for the current cycle: numeric
/// epoch in the value expression and threshold bounds, formatted datetime
/// in the alert texts.
#[derive(Debug, Clone)]
pub struct PreparedRule {
    pub value: Template,
    pub thresholds: Vec<Threshold>,
    pub texts: Vec<Template>,
}

impl PreparedRule {
    pub fn new(rule: &Rule, now: DateTime<Utc>) -> Self {
        let epoch = now.timestamp().to_string();
        let datetime = now.format("%Y/%m/%d %H:%M:%S").to_string();

        let mut value = rule.value.clone();
        value.substitute_now(&epoch);

        let mut thresholds = rule.thresholds.clone();
        for threshold in &mut thresholds {
            threshold.bound.substitute_now(&epoch);
        }

        let mut texts = rule.texts.clone();
        for text in &mut texts {
            text.substitute_now(&datetime);
        }

        Self {
            value,
            thresholds,
            texts,
        }
    }

    /// Comma-joined rendering of the threshold ladder, for alert payloads.
    pub fn threshold_info(&self) -> String {
        self.thresholds
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Transient per-resource state for one evaluation pass.
#[derive(Debug, Clone)]
pub struct ResourceAccumulator {
    pub thresholds: Vec<Threshold>,
    pub texts: Vec<Template>,
    /// Value expression under construction; stays `None` until a sample
    /// referenced by the rule's value template arrives.
    pub value: Option<Template>,
    pub environment: Vec<String>,
    pub service: Vec<String>,
    pub units: String,
    pub tags: Vec<String>,
    pub graph_urls: Vec<String>,
    pub more_info: String,
}

impl ResourceAccumulator {
    fn from_prepared(prepared: &PreparedRule) -> Self {
        Self {
            thresholds: prepared.thresholds.clone(),
            texts: prepared.texts.clone(),
            value: None,
            environment: Vec::new(),
            service: Vec::new(),
            units: String::new(),
            tags: Vec::new(),
            graph_urls: Vec::new(),
            more_info: String::new(),
        }
    }
}

/// Group samples by resolved resource and substitute metric values into
/// each resource's copy of the rule templates.
pub fn aggregate(
    rule: &Rule,
    prepared: &PreparedRule,
    samples: &[MetricSample],
) -> BTreeMap<String, ResourceAccumulator> {
    let mut resources: BTreeMap<String, ResourceAccumulator> = BTreeMap::new();
    let host_scoped = rule.resource.has_field(ResourceField::Host);
    let cluster_scoped = rule.resource.has_field(ResourceField::Cluster);

    for sample in samples {
        let resource = rule.resource.resolve_resource(
            sample.host.as_deref(),
            sample.instance.as_deref(),
            sample.cluster.as_deref(),
        );
        if resource.contains(UNRESOLVED) {
            tracing::debug!(
                sample = %sample.id,
                template = %rule.resource,
                "Sample does not resolve the resource template"
            );
            continue;
        }

        // Host-based samples must not feed cluster-level resources.
        if sample.host.is_some() && !host_scoped {
            tracing::debug!(
                sample = %sample.id,
                resource = %resource,
                "Skipping host-based sample for cluster-based rule"
            );
            continue;
        }

        let acc = resources
            .entry(resource)
            .or_insert_with(|| ResourceAccumulator::from_prepared(prepared));

        if prepared.value.references(&sample.metric) {
            acc.environment = vec![rule
                .environment
                .clone()
                .unwrap_or_else(|| sample.environment.clone())];
            acc.service = vec![rule
                .service
                .clone()
                .unwrap_or_else(|| sample.service.clone())];

            let Some(value) = selected_value(sample, &prepared.value) else {
                tracing::debug!(sample = %sample.id, "Sample carries no usable value");
                continue;
            };

            let tpl = acc.value.get_or_insert_with(|| prepared.value.clone());
            tpl.substitute_metric(&sample.metric, &value);
            acc.units = sample.units.clone();

            acc.tags = rule.tags.clone();
            if let Some(cluster) = &sample.cluster {
                acc.tags.push(format!("cluster:{cluster}"));
            }
            if let Some(tags) = &sample.tags {
                acc.tags.extend(tags.iter().cloned());
            }

            if let Some(graph_url) = &sample.graph_url {
                acc.graph_urls.push(graph_url.clone());
                let prefix = url_prefix(graph_url);
                for graph in &rule.graphs {
                    if host_scoped {
                        if let (Some(cluster), Some(host)) = (&sample.cluster, &sample.host) {
                            acc.graph_urls.push(format!(
                                "{prefix}/graph.php?c={cluster}&h={host}&m={graph}&r=1day&v=0&z=default"
                            ));
                        }
                    }
                    if cluster_scoped {
                        if let Some(cluster) = &sample.cluster {
                            acc.graph_urls.push(format!(
                                "{prefix}/graph.php?c={cluster}&m={graph}&r=1day&v=0&z=default"
                            ));
                        }
                    }
                }
                if host_scoped {
                    if let (Some(cluster), Some(host)) = (&sample.cluster, &sample.host) {
                        acc.more_info = format!("{prefix}/?c={cluster}&h={host}");
                    }
                }
                if cluster_scoped {
                    if let Some(cluster) = &sample.cluster {
                        acc.more_info = format!("{prefix}/?c={cluster}");
                    }
                }
            }
        }

        if prepared
            .thresholds
            .iter()
            .any(|t| t.bound.references(&sample.metric))
        {
            if let Some(value) = selected_value(sample, &prepared.value) {
                for threshold in &mut acc.thresholds {
                    threshold.bound.substitute_metric(&sample.metric, &value);
                }
            }
        }

        if prepared.texts.iter().any(|t| t.references(&sample.metric)) {
            if let Some(value) = selected_value(sample, &prepared.value) {
                let value = text_value(sample, &value);
                for text in &mut acc.texts {
                    text.substitute_metric(&sample.metric, &value);
                }
            }
        }
    }

    resources
}

/// Pick the substitution value for a sample: raw value first, the aggregate
/// sum when the value expression asks for `.sum`, otherwise the average,
/// with a zero sample count yielding `0.0`.
pub(crate) fn selected_value(sample: &MetricSample, value_tpl: &Template) -> Option<String> {
    if let Some(v) = &sample.value {
        return Some(quote(v));
    }
    if value_tpl.wants_sum(&sample.metric) {
        if let Some(sum) = &sample.sum {
            return Some(quote(sum));
        }
    }
    let sum: f64 = sample.sum.as_deref()?.parse().ok()?;
    let num: f64 = sample.num.as_deref()?.parse().ok()?;
    if num == 0.0 {
        return Some("0.0".to_string());
    }
    Some(format!("{:.1}", sum / num))
}

/// Quote a raw metric value for the expression grammar: integers stay
/// integers, other numerics get one decimal place, anything else is a
/// string literal.
pub(crate) fn quote(raw: &str) -> String {
    if let Ok(i) = raw.trim().parse::<i64>() {
        return i.to_string();
    }
    if let Ok(f) = raw.trim().parse::<f64>() {
        return format!("{f:.1}");
    }
    format!("\"{raw}\"")
}

/// In free-text context, timestamp-typed metrics render as datetimes.
fn text_value(sample: &MetricSample, value: &str) -> String {
    if sample.metric_type != "timestamp" && sample.units != "timestamp" {
        return value.to_string();
    }
    let Ok(epoch) = value.trim_matches('"').parse::<f64>() else {
        return value.to_string();
    };
    match Utc.timestamp_opt(epoch as i64, 0).single() {
        Some(dt) => dt.format("%Y/%m/%d %H:%M:%S").to_string(),
        None => value.to_string(),
    }
}

/// Graph-link prefix: the sample's graph URL minus its last path segment.
fn url_prefix(url: &str) -> &str {
    url.rsplit_once('/').map_or(url, |(prefix, _)| prefix)
}

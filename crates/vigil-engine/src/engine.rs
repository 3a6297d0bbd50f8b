use std::collections::HashMap;

use chrono::{DateTime, Utc};
use vigil_common::types::{format_units, AlertRecord, MetricSample, Severity};
use vigil_rules::Rule;

use crate::aggregate::{aggregate, PreparedRule, ResourceAccumulator};
use crate::error::EvalError;
use crate::eval::{evaluate, Value};

/// Key for hysteresis state: one entry per alertable (resource, event).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub resource: String,
    pub event: String,
}

/// Hysteresis state for one key.
///
/// Exactly one severity is current at a time. The current severity's
/// counter grows monotonically while current; when the current severity
/// changes, the *outgoing* severity's counter is zeroed (the incoming
/// one keeps whatever it had and is incremented).
#[derive(Debug, Clone)]
pub(crate) struct SeverityState {
    pub(crate) current: Severity,
    pub(crate) previous_alerted: Severity,
    pub(crate) counts: HashMap<Severity, u32>,
}

impl SeverityState {
    fn new(severity: Severity) -> Self {
        let mut counts = HashMap::new();
        counts.insert(severity, 0);
        Self {
            current: severity,
            previous_alerted: severity,
            counts,
        }
    }
}

/// The alert-state engine.
///
/// Owns the severity-state map for every (resource, event) key it has seen.
/// State lives for the life of the engine; entries are never removed, and
/// key cardinality is bounded by rule design. The caller must not run two
/// evaluation cycles concurrently against one engine (enforced by `&mut`).
pub struct AlertEngine {
    pub(crate) states: HashMap<AlertKey, SeverityState>,
}

impl AlertEngine {
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
        }
    }

    /// Evaluate one rule against its metric batch and return the alerts
    /// that fire. Every failure mode degrades to skipping the smallest
    /// affected unit; this never panics on rule or metric data.
    pub fn evaluate_rule(
        &mut self,
        rule: &Rule,
        samples: &[MetricSample],
        now: DateTime<Utc>,
    ) -> Vec<AlertRecord> {
        if let Err(e) = rule.validate() {
            tracing::warn!(event = %rule.event, error = %e, "Skipping invalid rule");
            return Vec::new();
        }

        let prepared = PreparedRule::new(rule, now);
        let resources = aggregate(rule, &prepared, samples);
        let threshold_info = prepared.threshold_info();

        let mut records = Vec::new();
        for (resource, acc) in &resources {
            let calculated = match self.calculated_value(rule, resource, acc) {
                Some(v) => v,
                None => continue,
            };
            tracing::debug!(resource = %resource, value = %calculated, "Calculated value");

            if let Some(record) =
                self.walk_thresholds(rule, resource, acc, &calculated, &threshold_info, now)
            {
                records.push(record);
            }
        }
        records
    }

    /// Evaluate the resource's substituted value expression.
    fn calculated_value(
        &self,
        rule: &Rule,
        resource: &str,
        acc: &ResourceAccumulator,
    ) -> Option<Value> {
        let result = match &acc.value {
            None => Err(EvalError::UnknownVariable(rule.value.render())),
            Some(tpl) => match tpl.first_unresolved() {
                Some(missing) => Err(EvalError::UnknownVariable(missing.to_string())),
                None => evaluate(&tpl.render()),
            },
        };
        match result {
            Ok(v) => Some(v),
            Err(e @ EvalError::UnknownVariable(_)) => {
                tracing::warn!(
                    event = %rule.event,
                    resource = %resource,
                    error = %e,
                    "Could not calculate value"
                );
                None
            }
            Err(EvalError::DivideByZero) => {
                tracing::debug!(
                    event = %rule.event,
                    resource = %resource,
                    "Division by zero calculating value, using 0 instead"
                );
                Some(Value::Num(0.0))
            }
            Err(e) => {
                tracing::error!(
                    event = %rule.event,
                    resource = %resource,
                    error = %e,
                    "Could not calculate value"
                );
                None
            }
        }
    }

    /// Walk the threshold ladder in declared order. The first threshold
    /// whose predicate holds ends the scan, whether or not it fires.
    #[allow(clippy::too_many_arguments)]
    fn walk_thresholds(
        &mut self,
        rule: &Rule,
        resource: &str,
        acc: &ResourceAccumulator,
        calculated: &Value,
        threshold_info: &str,
        now: DateTime<Utc>,
    ) -> Option<AlertRecord> {
        for (index, threshold) in acc.thresholds.iter().enumerate() {
            let result = match threshold.bound.first_unresolved() {
                Some(missing) => Err(EvalError::UnknownVariable(missing.to_string())),
                None => evaluate(&threshold.bound.render()),
            };
            let bound = match result {
                Ok(v) => v,
                Err(e) => {
                    tracing::error!(
                        event = %rule.event,
                        resource = %resource,
                        threshold = %threshold,
                        error = %e,
                        "Could not evaluate threshold"
                    );
                    continue;
                }
            };

            let matched = threshold.op.holds(calculated.compare(&bound));
            if !matched {
                continue;
            }

            let fired = self.advance_state(rule, resource, threshold.severity);
            if fired {
                return Some(AlertRecord {
                    id: uuid::Uuid::new_v4().to_string(),
                    resource: resource.to_string(),
                    event: rule.event.clone(),
                    group: rule.group.clone(),
                    value: format!("{calculated}{}", format_units(&acc.units)),
                    severity: threshold.severity,
                    environment: acc.environment.clone(),
                    service: acc.service.clone(),
                    text: acc.texts.get(index).map(|t| t.render()).unwrap_or_default(),
                    event_type: "metricAlert".to_string(),
                    tags: acc.tags.clone(),
                    threshold_info: threshold_info.to_string(),
                    more_info: acc.more_info.clone(),
                    graph_urls: acc.graph_urls.clone(),
                    timestamp: now,
                });
            }
            // First matching threshold wins even when suppressed.
            return None;
        }
        None
    }

    /// Advance the hysteresis state for a matched severity and decide
    /// whether an alert is due.
    fn advance_state(&mut self, rule: &Rule, resource: &str, severity: Severity) -> bool {
        let key = AlertKey {
            resource: resource.to_string(),
            event: rule.event.clone(),
        };
        let state = self
            .states
            .entry(key)
            .or_insert_with(|| SeverityState::new(severity));

        if state.current != severity {
            *state.counts.entry(severity).or_insert(0) += 1;
            // Zero the outgoing severity's counter, not the incoming one.
            state.counts.insert(state.current, 0);
            state.current = severity;
        } else {
            *state.counts.entry(severity).or_insert(0) += 1;
        }

        let count = state.counts[&severity];
        let repeat_due = rule.repeat > 0
            && (i64::from(count) - i64::from(rule.count)).rem_euclid(rule.repeat) == 0;

        tracing::debug!(
            resource = %resource,
            event = %rule.event,
            severity = %severity,
            count,
            repeat_due,
            "Threshold matched"
        );

        let fire = (state.previous_alerted != severity && count == rule.count)
            || (state.previous_alerted == severity && repeat_due);
        if fire {
            state.previous_alerted = severity;
        }
        fire
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

use std::cmp::Ordering;
use std::str::FromStr;

use serde::Deserialize;
use vigil_common::types::Severity;

use crate::error::RuleError;
use crate::template::Template;

/// Comparison operator used in threshold predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    LessThan,
    GreaterEqual,
    LessEqual,
    Equal,
    NotEqual,
}

impl FromStr for CompareOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" | "greater_than" | "gt" => Ok(Self::GreaterThan),
            "<" | "less_than" | "lt" => Ok(Self::LessThan),
            ">=" | "greater_equal" | "gte" => Ok(Self::GreaterEqual),
            "<=" | "less_equal" | "lte" => Ok(Self::LessEqual),
            "==" | "eq" => Ok(Self::Equal),
            "!=" | "ne" => Ok(Self::NotEqual),
            _ => Err(format!("unknown compare operator: {s}")),
        }
    }
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => write!(f, ">"),
            Self::LessThan => write!(f, "<"),
            Self::GreaterEqual => write!(f, ">="),
            Self::LessEqual => write!(f, "<="),
            Self::Equal => write!(f, "=="),
            Self::NotEqual => write!(f, "!="),
        }
    }
}

impl CompareOp {
    /// Whether this operator holds for an ordering between two operands.
    /// `None` (incomparable operands) never holds.
    pub fn holds(&self, ord: Option<Ordering>) -> bool {
        let Some(ord) = ord else { return false };
        match self {
            Self::GreaterThan => ord == Ordering::Greater,
            Self::LessThan => ord == Ordering::Less,
            Self::GreaterEqual => ord != Ordering::Less,
            Self::LessEqual => ord != Ordering::Greater,
            Self::Equal => ord == Ordering::Equal,
            Self::NotEqual => ord != Ordering::Equal,
        }
    }
}

/// One rung of a rule's threshold ladder: `SEVERITY:op:bound`.
///
/// The bound is a template; after substitution it is evaluated as an
/// expression, so bounds like `$now - 300` are valid.
#[derive(Debug, Clone)]
pub struct Threshold {
    pub severity: Severity,
    pub op: CompareOp,
    pub bound: Template,
}

impl Threshold {
    pub fn parse(s: &str) -> Result<Self, RuleError> {
        let mut parts = s.splitn(3, ':');
        let (Some(sev), Some(op), Some(bound)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RuleError::BadThreshold(s.to_string()));
        };
        Ok(Self {
            severity: sev.parse().map_err(RuleError::UnknownSeverity)?,
            op: op.parse().map_err(RuleError::UnknownOperator)?,
            bound: Template::expr(bound),
        })
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.severity, self.op, self.bound)
    }
}

/// A rule as it appears in the YAML rule file, before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSpec {
    pub event: String,
    pub group: String,
    /// Resource-name template, e.g. `"$host"` or `"$cluster:lb"`.
    pub resource: String,
    /// Optional extra filter forwarded verbatim to the metric source.
    #[serde(default)]
    pub filter: Option<String>,
    /// Ordered `SEVERITY:op:bound` strings; first match wins.
    pub thresholds: Vec<String>,
    /// Alert texts, index-aligned with `thresholds`.
    pub text: Vec<String>,
    /// Template producing the numeric expression to evaluate.
    pub value: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub graphs: Vec<String>,
    #[serde(default)]
    pub environment: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    /// Occurrences at a severity before the first alert fires.
    #[serde(default = "default_count")]
    pub count: u32,
    /// Occurrences between repeat alerts; zero or negative disables repeats.
    #[serde(default = "default_repeat")]
    pub repeat: i64,
}

fn default_count() -> u32 {
    1
}

fn default_repeat() -> i64 {
    1
}

/// A compiled rule: thresholds parsed, every template tokenized.
#[derive(Debug, Clone)]
pub struct Rule {
    pub event: String,
    pub group: String,
    pub resource: Template,
    pub filter: Option<String>,
    pub thresholds: Vec<Threshold>,
    pub texts: Vec<Template>,
    pub value: Template,
    pub tags: Vec<String>,
    pub graphs: Vec<String>,
    pub environment: Option<String>,
    pub service: Option<String>,
    pub count: u32,
    pub repeat: i64,
}

impl Rule {
    /// Compile a raw spec, rejecting structurally invalid rules.
    pub fn compile(spec: RuleSpec) -> Result<Self, RuleError> {
        if spec.thresholds.len() != spec.text.len() {
            return Err(RuleError::TextMismatch {
                event: spec.event,
                thresholds: spec.thresholds.len(),
                texts: spec.text.len(),
            });
        }
        let thresholds = spec
            .thresholds
            .iter()
            .map(|t| Threshold::parse(t))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            event: spec.event,
            group: spec.group,
            resource: Template::resource(&spec.resource),
            filter: spec.filter,
            thresholds,
            texts: spec.text.iter().map(|t| Template::expr(t)).collect(),
            value: Template::expr(&spec.value),
            tags: spec.tags,
            graphs: spec.graphs,
            environment: spec.environment,
            service: spec.service,
            count: spec.count,
            repeat: spec.repeat,
        })
    }

    /// Structural validity check: one alert text per threshold.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.thresholds.len() != self.texts.len() {
            return Err(RuleError::TextMismatch {
                event: self.event.clone(),
                thresholds: self.thresholds.len(),
                texts: self.texts.len(),
            });
        }
        Ok(())
    }
}

/// Compile multiple specs, skipping invalid ones with warnings.
pub fn compile_rules(specs: Vec<RuleSpec>) -> Vec<Rule> {
    let mut rules = Vec::with_capacity(specs.len());
    for spec in specs {
        let event = spec.event.clone();
        match Rule::compile(spec) {
            Ok(rule) => rules.push(rule),
            Err(e) => {
                tracing::warn!(event = %event, error = %e, "Skipping invalid rule");
            }
        }
    }
    rules
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Alert severity level, ordered from lowest to highest.
///
/// # Examples
///
/// ```
/// use vigil_common::types::Severity;
///
/// let sev: Severity = "MAJOR".parse().unwrap();
/// assert_eq!(sev, Severity::Major);
/// assert_eq!(sev.to_string(), "major");
/// assert!(Severity::Critical > Severity::Warning);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Unknown,
    Inform,
    Normal,
    Warning,
    Minor,
    Major,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Unknown => write!(f, "unknown"),
            Severity::Inform => write!(f, "inform"),
            Severity::Normal => write!(f, "normal"),
            Severity::Warning => write!(f, "warning"),
            Severity::Minor => write!(f, "minor"),
            Severity::Major => write!(f, "major"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Severity::Unknown),
            "inform" => Ok(Severity::Inform),
            "normal" => Ok(Severity::Normal),
            "warning" => Ok(Severity::Warning),
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {s}")),
        }
    }
}

/// One metric sample as returned by the metric source.
///
/// A sample carries either a raw `value` or a `(sum, num)` aggregate pair.
/// Values are kept as strings: the source reports numerics and free text
/// through the same field, and quoting happens at substitution time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricSample {
    pub id: String,
    pub metric: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub sum: Option<String>,
    #[serde(default)]
    pub num: Option<String>,
    #[serde(default)]
    pub units: String,
    #[serde(default, rename = "type")]
    pub metric_type: String,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub cluster: Option<String>,
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default, rename = "graphUrl")]
    pub graph_url: Option<String>,
}

/// Metric source response body.
#[derive(Debug, Clone, Deserialize)]
pub struct MetricResponse {
    pub status: String,
    #[serde(default)]
    pub metrics: Vec<MetricSample>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub time: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// An alert produced by the threshold engine, ready for a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub id: String,
    pub resource: String,
    pub event: String,
    pub group: String,
    /// Calculated value plus unit suffix, e.g. `"93.5%"`.
    pub value: String,
    pub severity: Severity,
    pub environment: Vec<String>,
    pub service: Vec<String>,
    pub text: String,
    pub event_type: String,
    pub tags: Vec<String>,
    /// Comma-joined rendering of the rule's threshold ladder.
    pub threshold_info: String,
    pub more_info: String,
    pub graph_urls: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Liveness signal sent by the daemon once per completed check cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Heartbeat {
    pub id: String,
    pub origin: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

impl Heartbeat {
    pub fn new(origin: &str, version: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            origin: origin.to_string(),
            version: version.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Format a unit string as the suffix appended to an alert value.
///
/// # Examples
///
/// ```
/// use vigil_common::types::format_units;
///
/// assert_eq!(format_units("seconds"), "s");
/// assert_eq!(format_units("%"), "%");
/// assert_eq!(format_units("KB/sec"), " KB/sec");
/// assert_eq!(format_units(""), "");
/// ```
pub fn format_units(units: &str) -> String {
    match units {
        "seconds" | "s" => "s".to_string(),
        "percent" | "%" => "%".to_string(),
        "" => String::new(),
        other => format!(" {other}"),
    }
}

/// Errors raised while loading or compiling rules.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// The rule file could not be read.
    #[error("Rules: failed to read rule file: {0}")]
    Io(#[from] std::io::Error),

    /// The rule file is not valid YAML for the expected schema.
    #[error("Rules: failed to parse rule file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A threshold entry is not of the form `SEVERITY:op:bound`.
    #[error("Rules: malformed threshold '{0}', expected SEVERITY:op:bound")]
    BadThreshold(String),

    /// The threshold operator is not part of the comparison grammar.
    #[error("Rules: unknown compare operator: {0}")]
    UnknownOperator(String),

    /// The threshold severity is not a recognised level.
    #[error("Rules: {0}")]
    UnknownSeverity(String),

    /// Each threshold must have exactly one alert text at the same index.
    #[error(
        "Rules: rule '{event}' has {thresholds} thresholds but {texts} texts, \
         alert text must be defined for each threshold"
    )]
    TextMismatch {
        event: String,
        thresholds: usize,
        texts: usize,
    },
}

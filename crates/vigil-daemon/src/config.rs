use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// YAML rule file, re-read at the start of every check cycle.
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Origin reported in heartbeats.
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub sink: SinkConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
    /// Required when `kind = "webhook"`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    #[default]
    Console,
    Webhook,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_source_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            kind: SinkKind::Console,
            endpoint: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_rules_file() -> String {
    "config/rules.yaml".to_string()
}

fn default_interval_secs() -> u64 {
    20
}

fn default_origin() -> String {
    "vigil-daemon".to_string()
}

fn default_source_endpoint() -> String {
    "http://localhost:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

impl DaemonConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        if config.sink.kind == SinkKind::Webhook && config.sink.endpoint.is_none() {
            anyhow::bail!("sink.endpoint is required when sink.kind is \"webhook\"");
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_an_empty_config() {
        let config: DaemonConfig = toml::from_str("").unwrap();
        assert_eq!(config.rules_file, "config/rules.yaml");
        assert_eq!(config.interval_secs, 20);
        assert_eq!(config.origin, "vigil-daemon");
        assert_eq!(config.source.endpoint, "http://localhost:8080");
        assert_eq!(config.source.timeout_secs, 15);
        assert_eq!(config.sink.kind, SinkKind::Console);
    }

    #[test]
    fn parses_a_webhook_sink() {
        let config: DaemonConfig = toml::from_str(
            r#"
rules_file = "rules/prod.yaml"
interval_secs = 60

[source]
endpoint = "http://gmetad:8080"
timeout_secs = 5

[sink]
kind = "webhook"
endpoint = "http://alerta:8080"
"#,
        )
        .unwrap();
        assert_eq!(config.rules_file, "rules/prod.yaml");
        assert_eq!(config.interval_secs, 60);
        assert_eq!(config.sink.kind, SinkKind::Webhook);
        assert_eq!(config.sink.endpoint.as_deref(), Some("http://alerta:8080"));
    }
}

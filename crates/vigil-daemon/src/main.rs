use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use tokio::signal;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing_subscriber::EnvFilter;
use vigil_common::types::Heartbeat;
use vigil_engine::AlertEngine;
use vigil_notify::{AlertSink, ConsoleSink, WebhookSink};
use vigil_rules::{loader::load_rules, MetricQuery, Rule};
use vigil_source::{HttpMetricSource, MetricSource};

mod config;

use config::{DaemonConfig, SinkKind};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/daemon.toml");
    let config = DaemonConfig::load(config_path)?;

    let source = HttpMetricSource::new(&config.source.endpoint, config.source.timeout_secs)?;
    let sink: Box<dyn AlertSink> = match config.sink.kind {
        SinkKind::Webhook => {
            let endpoint = config
                .sink
                .endpoint
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("webhook sink requires an endpoint"))?;
            Box::new(WebhookSink::new(endpoint, config.sink.timeout_secs)?)
        }
        SinkKind::Console => Box::new(ConsoleSink),
    };

    let mut engine = AlertEngine::new();
    let mut ticker = interval(Duration::from_secs(config.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        rules_file = %config.rules_file,
        source = %config.source.endpoint,
        interval_secs = config.interval_secs,
        "vigil daemon started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_cycle(&config, &source, sink.as_ref(), &mut engine).await;
            }
            _ = signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        }
    }
    Ok(())
}

/// One check cycle: reload rules, fetch, evaluate, publish, heartbeat.
async fn run_cycle(
    config: &DaemonConfig,
    source: &HttpMetricSource,
    sink: &dyn AlertSink,
    engine: &mut AlertEngine,
) {
    let rules = reload_rules(&config.rules_file);
    let mut fired = 0usize;

    for rule in &rules {
        let query = MetricQuery::for_rule(rule);
        let samples = match source.fetch(&query).await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::error!(event = %rule.event, error = %e, "Metric fetch failed");
                continue;
            }
        };

        for alert in engine.evaluate_rule(rule, &samples, Utc::now()) {
            match sink.send_alert(&alert).await {
                Ok(()) => fired += 1,
                Err(e) => {
                    tracing::error!(
                        resource = %alert.resource,
                        event = %alert.event,
                        error = %e,
                        "Alert delivery failed"
                    );
                }
            }
        }
    }

    let heartbeat = Heartbeat::new(&config.origin, env!("CARGO_PKG_VERSION"));
    if let Err(e) = sink.send_heartbeat(&heartbeat).await {
        tracing::warn!(error = %e, "Heartbeat delivery failed");
    }

    tracing::info!(rules = rules.len(), alerts = fired, "Check cycle complete");
}

/// Rules are re-read every cycle so edits take effect without a restart.
/// A load failure degrades to an empty rule set for this cycle.
fn reload_rules(path: &str) -> Vec<Rule> {
    match load_rules(Path::new(path)) {
        Ok(rules) => rules,
        Err(e) => {
            tracing::error!(path = %path, error = %e, "Failed to load rules");
            Vec::new()
        }
    }
}

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  vigil-daemon [config.toml]    Start the daemon (default: config/daemon.toml)");
}

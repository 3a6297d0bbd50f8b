use std::io::Write;

use crate::loader::load_rules;
use crate::query::MetricQuery;
use crate::rule::{compile_rules, CompareOp, Rule, RuleSpec, Threshold};
use crate::template::{ResourceField, Template, UNRESOLVED};
use crate::RuleError;
use vigil_common::types::Severity;

fn spec(thresholds: &[&str], texts: &[&str]) -> RuleSpec {
    RuleSpec {
        event: "HighLoad".to_string(),
        group: "OS".to_string(),
        resource: "$host".to_string(),
        filter: None,
        thresholds: thresholds.iter().map(|s| s.to_string()).collect(),
        text: texts.iter().map(|s| s.to_string()).collect(),
        value: "$load_one".to_string(),
        tags: vec![],
        graphs: vec![],
        environment: None,
        service: None,
        count: 1,
        repeat: 1,
    }
}

// --- templates ---

#[test]
fn resource_templates_recognise_naming_fields() {
    let tpl = Template::resource("$cluster:$host/$instance");
    assert!(tpl.has_field(ResourceField::Cluster));
    assert!(tpl.has_field(ResourceField::Host));
    assert!(tpl.has_field(ResourceField::Instance));
    assert_eq!(
        tpl.resolve_resource(Some("web01"), Some("eth0"), Some("web")),
        "web:web01/eth0"
    );
}

#[test]
fn unknown_resource_placeholders_stay_literal() {
    let tpl = Template::resource("$host:$port");
    assert_eq!(tpl.resolve_resource(Some("web01"), None, None), "web01:$port");
    assert!(tpl.metric_names().next().is_none());
}

#[test]
fn missing_fields_resolve_to_the_unresolved_marker() {
    let tpl = Template::resource("$cluster:lb");
    let resolved = tpl.resolve_resource(Some("web01"), None, None);
    assert!(resolved.contains(UNRESOLVED));
}

#[test]
fn expression_templates_treat_identifiers_as_metrics() {
    let tpl = Template::expr("$cpu_user + $cpu_system + $host");
    let names: Vec<_> = tpl.metric_names().collect();
    assert_eq!(names, vec!["cpu_user", "cpu_system", "host"]);
    assert!(tpl.references("cpu_user"));
    assert!(!tpl.references("cpu"));
}

#[test]
fn now_is_never_a_metric() {
    let tpl = Template::expr("$now - $heartbeat");
    let names: Vec<_> = tpl.metric_names().collect();
    assert_eq!(names, vec!["heartbeat"]);

    let mut tpl = tpl;
    tpl.substitute_now("1000");
    assert_eq!(tpl.render(), "1000 - $heartbeat");
}

#[test]
fn sum_suffix_selects_the_aggregate() {
    let tpl = Template::expr("$bytes_out.sum / 8");
    assert!(tpl.wants_sum("bytes_out"));
    assert!(!tpl.wants_sum("bytes_in"));
    assert_eq!(tpl.metric_names().collect::<Vec<_>>(), vec!["bytes_out"]);
}

#[test]
fn substitution_replaces_plain_and_sum_forms() {
    let mut tpl = Template::expr("$pkts.sum + $pkts");
    tpl.substitute_metric("pkts", "9");
    assert_eq!(tpl.render(), "9 + 9");
    assert!(tpl.first_unresolved().is_none());
}

#[test]
fn substituted_values_are_not_rescanned() {
    let mut tpl = Template::expr("$label");
    tpl.substitute_metric("label", "$injected");
    assert_eq!(tpl.render(), "$injected");
    assert!(tpl.first_unresolved().is_none());
    assert!(!tpl.references("injected"));
}

#[test]
fn first_unresolved_reports_in_order() {
    let mut tpl = Template::expr("$a + $b");
    assert_eq!(tpl.first_unresolved(), Some("a"));
    tpl.substitute_metric("a", "1");
    assert_eq!(tpl.first_unresolved(), Some("b"));
}

// --- operators and thresholds ---

#[test]
fn compare_ops_parse_symbols_and_names() {
    assert_eq!(">".parse::<CompareOp>().unwrap(), CompareOp::GreaterThan);
    assert_eq!("lte".parse::<CompareOp>().unwrap(), CompareOp::LessEqual);
    assert_eq!(
        "greater_equal".parse::<CompareOp>().unwrap(),
        CompareOp::GreaterEqual
    );
    assert!("~=".parse::<CompareOp>().is_err());
}

#[test]
fn compare_op_holds_on_orderings() {
    use std::cmp::Ordering::*;
    assert!(CompareOp::GreaterThan.holds(Some(Greater)));
    assert!(!CompareOp::GreaterThan.holds(Some(Equal)));
    assert!(CompareOp::GreaterEqual.holds(Some(Equal)));
    assert!(CompareOp::NotEqual.holds(Some(Less)));
    // Incomparable operands never hold.
    assert!(!CompareOp::Equal.holds(None));
}

#[test]
fn thresholds_parse_severity_op_and_bound() {
    let t = Threshold::parse("major:>:5 * 0.9").unwrap();
    assert_eq!(t.severity, Severity::Major);
    assert_eq!(t.op, CompareOp::GreaterThan);
    assert_eq!(t.bound.render(), "5 * 0.9");
    assert_eq!(t.to_string(), "major:>:5 * 0.9");
}

#[test]
fn threshold_bounds_may_reference_metrics() {
    let t = Threshold::parse("warning:>=:$cpu_num * 2").unwrap();
    assert_eq!(
        t.bound.metric_names().collect::<Vec<_>>(),
        vec!["cpu_num"]
    );
}

#[test]
fn malformed_thresholds_are_rejected() {
    assert!(matches!(
        Threshold::parse("major:>"),
        Err(RuleError::BadThreshold(_))
    ));
    assert!(matches!(
        Threshold::parse("severe:>:5"),
        Err(RuleError::UnknownSeverity(_))
    ));
    assert!(matches!(
        Threshold::parse("major:~=:5"),
        Err(RuleError::UnknownOperator(_))
    ));
}

// --- rule compilation ---

#[test]
fn compiles_a_minimal_rule() {
    let rule = Rule::compile(spec(&["major:>:5"], &["load is $load_one"])).unwrap();
    assert_eq!(rule.event, "HighLoad");
    assert_eq!(rule.thresholds.len(), 1);
    assert_eq!(rule.count, 1);
    assert_eq!(rule.repeat, 1);
    rule.validate().unwrap();
}

#[test]
fn rejects_text_threshold_count_mismatch() {
    let err = Rule::compile(spec(&["major:>:5", "normal:<=:5"], &["only one"])).unwrap_err();
    assert!(matches!(err, RuleError::TextMismatch { .. }));
}

#[test]
fn compile_rules_skips_invalid_specs() {
    let rules = compile_rules(vec![
        spec(&["major:>:5"], &["ok"]),
        spec(&["major:bogus:5"], &["bad"]),
        spec(&["normal:<=:5"], &["ok too"]),
    ]);
    assert_eq!(rules.len(), 2);
}

// --- metric queries ---

#[test]
fn query_collects_metrics_from_every_template() {
    let mut s = spec(&["major:>:$cpu_num * 2"], &["load $load_one on $host_label"]);
    s.value = "$load_one + $load_five".to_string();
    let rule = Rule::compile(s).unwrap();

    let query = MetricQuery::for_rule(&rule);
    let names: Vec<_> = query.metrics.iter().cloned().collect();
    assert_eq!(
        names,
        vec!["cpu_num", "host_label", "load_five", "load_one"]
    );
    assert_eq!(
        query.to_query_string(),
        "metric=cpu_num&metric=host_label&metric=load_five&metric=load_one"
    );
}

#[test]
fn query_excludes_now_and_prepends_the_filter() {
    let mut s = spec(&["major:>:$now - 300"], &["stale since $now"]);
    s.value = "$heartbeat".to_string();
    s.filter = Some("cluster=web".to_string());
    let rule = Rule::compile(s).unwrap();

    let query = MetricQuery::for_rule(&rule);
    assert_eq!(
        query.to_query_string(),
        "cluster=web&metric=heartbeat"
    );
}

#[test]
fn query_emptiness() {
    let mut s = spec(&["major:>:5"], &["static text"]);
    s.value = "1".to_string();
    let rule = Rule::compile(s).unwrap();
    assert!(MetricQuery::for_rule(&rule).is_empty());
}

// --- YAML loading ---

const RULES_YAML: &str = r#"
- event: HighLoad
  group: OS
  resource: $host
  value: $load_one
  thresholds:
    - "critical:>:10"
    - "major:>:5"
    - "normal:<=:5"
  text:
    - "Load average is $load_one"
    - "Load average is $load_one"
    - "Load average is $load_one"
  tags: [os]
  graphs: [load_report]
  count: 2
  repeat: 10

- event: Broken
  group: OS
  resource: $host
  value: $load_one
  thresholds: ["major:>:5", "normal:<=:5"]
  text: ["mismatched"]
"#;

#[test]
fn loads_rules_from_yaml() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(RULES_YAML.as_bytes()).unwrap();

    let rules = load_rules(file.path()).unwrap();
    // The mismatched rule is skipped, not fatal.
    assert_eq!(rules.len(), 1);

    let rule = &rules[0];
    assert_eq!(rule.event, "HighLoad");
    assert_eq!(rule.thresholds.len(), 3);
    assert_eq!(rule.thresholds[0].severity, Severity::Critical);
    assert_eq!(rule.count, 2);
    assert_eq!(rule.repeat, 10);
    assert_eq!(rule.tags, vec!["os"]);
}

#[test]
fn unreadable_rule_file_is_an_error() {
    assert!(matches!(
        load_rules(std::path::Path::new("/nonexistent/rules.yaml")),
        Err(RuleError::Io(_))
    ));
}

#[test]
fn invalid_yaml_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"event: not-a-list").unwrap();
    assert!(matches!(
        load_rules(file.path()),
        Err(RuleError::Yaml(_))
    ));
}

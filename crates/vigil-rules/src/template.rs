use std::sync::LazyLock;

use regex::Regex;

/// Marker left in a resolved resource name when the sample lacks the
/// corresponding field. A resource containing this marker is rejected.
pub const UNRESOLVED: &str = "__unresolved__";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$([A-Za-z0-9_]+)(\.sum)?").expect("placeholder pattern"));

/// Fields of a metric sample that resource templates can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceField {
    Host,
    Instance,
    Cluster,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Literal(String),
    /// `$now`, substituted once per cycle.
    Now,
    /// `$host` / `$instance` / `$cluster` in a resource template.
    Field(ResourceField),
    /// `$<metric>` or `$<metric>.sum` in an expression or text template.
    Metric { name: String, sum: bool },
}

/// A template string parsed once into literal and placeholder tokens.
///
/// Substitution replaces placeholder tokens with literal tokens, so a
/// substituted value can never be re-scanned for further placeholders.
///
/// Two parse modes exist. [`Template::resource`] recognises the resource
/// fields (`$host`, `$instance`, `$cluster`) and leaves every other
/// placeholder literal. [`Template::expr`] treats every identifier except
/// `now` as a metric reference, which is also the contract of the metric
/// requirement extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    tokens: Vec<Token>,
}

impl Template {
    /// Parse a resource-name template.
    pub fn resource(s: &str) -> Self {
        Self::parse(s, true)
    }

    /// Parse a value-expression, threshold-bound, or alert-text template.
    pub fn expr(s: &str) -> Self {
        Self::parse(s, false)
    }

    fn parse(s: &str, resource_mode: bool) -> Self {
        let mut tokens = Vec::new();
        let mut last = 0;
        for caps in PLACEHOLDER.captures_iter(s) {
            let whole = caps.get(0).expect("match");
            let name = caps.get(1).expect("ident").as_str();
            let sum = caps.get(2).is_some();

            // `.sum` only means aggregate selection in expression context
            let (end, sum) = if resource_mode && sum {
                (caps.get(1).expect("ident").end(), false)
            } else {
                (whole.end(), sum)
            };

            if whole.start() > last {
                tokens.push(Token::Literal(s[last..whole.start()].to_string()));
            }
            last = end;

            let token = if resource_mode {
                match name {
                    "host" => Token::Field(ResourceField::Host),
                    "instance" => Token::Field(ResourceField::Instance),
                    "cluster" => Token::Field(ResourceField::Cluster),
                    _ => Token::Literal(format!("${name}")),
                }
            } else if name == "now" {
                Token::Now
            } else {
                Token::Metric {
                    name: name.to_string(),
                    sum,
                }
            };
            tokens.push(token);
        }
        if last < s.len() {
            tokens.push(Token::Literal(s[last..].to_string()));
        }
        Self { tokens }
    }

    /// Metric names referenced by this template, in order of appearance.
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Metric { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Whether any placeholder references the given metric.
    pub fn references(&self, metric: &str) -> bool {
        self.metric_names().any(|n| n == metric)
    }

    /// Whether the template selects the aggregate sum of the given metric.
    pub fn wants_sum(&self, metric: &str) -> bool {
        self.tokens.iter().any(|t| {
            matches!(t, Token::Metric { name, sum: true } if name == metric)
        })
    }

    pub fn has_field(&self, field: ResourceField) -> bool {
        self.tokens.iter().any(|t| matches!(t, Token::Field(f) if *f == field))
    }

    /// First metric placeholder still awaiting substitution, if any.
    pub fn first_unresolved(&self) -> Option<&str> {
        self.metric_names().next()
    }

    /// Replace `$now` with an already-rendered value. The caller picks the
    /// rendering: numeric epoch in expression context, formatted datetime
    /// in free-text context.
    pub fn substitute_now(&mut self, rendered: &str) {
        for token in &mut self.tokens {
            if matches!(token, Token::Now) {
                *token = Token::Literal(rendered.to_string());
            }
        }
    }

    /// Replace every placeholder for `metric` (plain and `.sum` forms alike)
    /// with an already-quoted value.
    pub fn substitute_metric(&mut self, metric: &str, value: &str) {
        for token in &mut self.tokens {
            if matches!(token, Token::Metric { name, .. } if name == metric) {
                *token = Token::Literal(value.to_string());
            }
        }
    }

    /// Resolve a resource template against a sample's naming fields.
    /// A missing field renders as [`UNRESOLVED`].
    pub fn resolve_resource(
        &self,
        host: Option<&str>,
        instance: Option<&str>,
        cluster: Option<&str>,
    ) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Now => out.push_str("$now"),
                Token::Field(ResourceField::Host) => out.push_str(host.unwrap_or(UNRESOLVED)),
                Token::Field(ResourceField::Instance) => {
                    out.push_str(instance.unwrap_or(UNRESOLVED));
                }
                Token::Field(ResourceField::Cluster) => {
                    out.push_str(cluster.unwrap_or(UNRESOLVED));
                }
                Token::Metric { name, sum } => {
                    out.push('$');
                    out.push_str(name);
                    if *sum {
                        out.push_str(".sum");
                    }
                }
            }
        }
        out
    }

    /// Render the template, printing unresolved placeholders back in their
    /// `$name` source form.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for token in &self.tokens {
            match token {
                Token::Literal(s) => out.push_str(s),
                Token::Now => out.push_str("$now"),
                Token::Field(ResourceField::Host) => out.push_str("$host"),
                Token::Field(ResourceField::Instance) => out.push_str("$instance"),
                Token::Field(ResourceField::Cluster) => out.push_str("$cluster"),
                Token::Metric { name, sum } => {
                    out.push('$');
                    out.push_str(name);
                    if *sum {
                        out.push_str(".sum");
                    }
                }
            }
        }
        out
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

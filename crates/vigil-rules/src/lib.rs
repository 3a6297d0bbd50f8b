//! Rule model for the vigil threshold engine.
//!
//! Rules arrive as YAML (see [`loader`]) and are compiled once into a typed
//! [`Rule`]: threshold strings are parsed into a severity/operator/bound
//! ladder and every template string is tokenized into a [`template::Template`]
//! so that evaluation cycles never re-scan text for placeholders.

pub mod error;
pub mod loader;
pub mod query;
pub mod rule;
pub mod template;

#[cfg(test)]
mod tests;

pub use error::RuleError;
pub use query::MetricQuery;
pub use rule::{compile_rules, CompareOp, Rule, RuleSpec, Threshold};
pub use template::{ResourceField, Template, UNRESOLVED};

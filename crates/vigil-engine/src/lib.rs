//! Threshold rule evaluation and alert-state engine.
//!
//! Given a compiled rule and a batch of metric samples, the engine groups
//! samples by resolved resource name, substitutes metric values into the
//! rule's templates, evaluates the value expression through a restricted
//! grammar, walks the threshold ladder (first match wins), and drives a
//! per-(resource, event) hysteresis state machine that decides whether an
//! alert fires.
//!
//! The engine is synchronous and does no I/O; fetching metrics and
//! publishing alerts are the caller's concern.

pub mod aggregate;
pub mod engine;
pub mod error;
pub mod eval;


pub use engine::{AlertEngine, AlertKey};
pub use error::EvalError;
pub use eval::{evaluate, Value};

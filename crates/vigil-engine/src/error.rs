/// Errors from evaluating a substituted expression.
///
/// None of these are fatal to a check cycle: syntax errors skip the
/// affected resource or threshold, division by zero degrades to `0.0`,
/// and an unknown variable means a required metric is not reporting yet.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// The expression is malformed after substitution.
    #[error("Eval: bad syntax: {0}")]
    BadSyntax(String),

    /// Division by zero inside the expression.
    #[error("Eval: division by zero")]
    DivideByZero,

    /// A metric placeholder was never substituted, i.e. the metric is
    /// absent from the sample batch.
    #[error("Eval: metric '{0}' is not being reported")]
    UnknownVariable(String),
}

use thiserror::Error;

/// Failures of the engine proper.
///
/// "Not applicable" is deliberately absent: plans signal it by returning
/// `Ok(None)`. Everything here is either a caller mistake (malformed
/// input, unknown names) or an exhausted defensive budget, and each is
/// surfaced distinctly so the caller can map them to different responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("unknown plan '{0}'")]
    UnknownPlan(String),
    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),
    #[error("solution variable '{0}' does not occur in the input")]
    UnknownVariable(String),
    #[error("plan '{plan}' exceeded its iteration budget of {limit}")]
    IterationBudgetExceeded { plan: String, limit: u32 },
    #[error("rewrite budget exhausted")]
    RewriteBudgetExceeded,
    #[error("computation interrupted by deadline")]
    Interrupted,
}

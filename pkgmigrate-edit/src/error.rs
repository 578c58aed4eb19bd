use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// The plan was computed against a different document.
    #[error("plan does not belong to this document ({expected} nodes planned, {actual} present)")]
    PlanMismatch { expected: usize, actual: usize },
}

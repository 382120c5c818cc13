use std::path::PathBuf;

/// Errors surfaced by the solver and the classroom tools.
#[derive(Debug, thiserror::Error)]
pub enum SolverError {
    /// Invalid parameters; the solve is never attempted.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Iteration budget spent before the residual dropped below tolerance.
    #[error("no convergence after {iterations} sweeps (residual {residual:.3e})")]
    ConvergenceNotReached { iterations: usize, residual: f64 },

    /// A file the session needs is missing or unreadable.
    #[error("cannot open '{}': {reason}", path.display())]
    Resource { path: PathBuf, reason: String },
}

impl SolverError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        SolverError::Configuration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SolverError::ConvergenceNotReached {
            iterations: 1,
            residual: 0.5,
        };
        assert!(err.to_string().contains("1 sweeps"));

        let err = SolverError::Resource {
            path: PathBuf::from("frame.png"),
            reason: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "cannot open 'frame.png': not found");
    }
}

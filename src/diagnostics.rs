use std::sync::Arc;
use std::time::Duration;

/// Observational event emitted by the store. Never affects control flow.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// An operation completed (successfully or not).
    Trace {
        op: &'static str,
        key: String,
        outcome: Outcome,
        elapsed: Duration,
    },
    /// The map reported an error.
    StoreError {
        op: &'static str,
        key: String,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Found,
    Missing,
    Written { ttl: Option<Duration> },
    Removed,
    Failed,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found => write!(f, "found"),
            Self::Missing => write!(f, "missing"),
            Self::Written { ttl: Some(ttl) } => write!(f, "written ttl:{}ms", ttl.as_millis()),
            Self::Written { ttl: None } => write!(f, "written ttl:none"),
            Self::Removed => write!(f, "removed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace {
                op,
                key,
                outcome,
                elapsed,
            } => write!(
                f,
                "{} \"{}\" {} in {}ms",
                op.to_uppercase(),
                key,
                outcome,
                elapsed.as_millis()
            ),
            Self::StoreError { op, key, message } => {
                write!(f, "{} \"{}\" store error: {}", op.to_uppercase(), key, message)
            }
        }
    }
}

/// Callback receiving [`Diagnostic`] events.
pub type DiagnosticHook = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

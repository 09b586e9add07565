//! Shared value types

/// Outcome of a best-effort step
///
/// Loop extraction and style transfer never fail a job. Instead of swallowing
/// errors they report `Degraded` with the reason, and the caller picks the
/// fallback explicitly.
#[derive(Debug, Clone, PartialEq)]
pub enum BestEffort<T> {
    /// Step produced its value
    Applied(T),
    /// Step could not run; caller continues without it
    Degraded { reason: String },
}

impl<T> BestEffort<T> {
    pub fn degraded(reason: impl Into<String>) -> Self {
        BestEffort::Degraded {
            reason: reason.into(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, BestEffort::Applied(_))
    }

    /// Value if applied, otherwise `fallback`
    pub fn unwrap_or(self, fallback: T) -> T {
        match self {
            BestEffort::Applied(value) => value,
            BestEffort::Degraded { .. } => fallback,
        }
    }

    pub fn unwrap_or_default(self) -> T
    where
        T: Default,
    {
        self.applied().unwrap_or_default()
    }

    pub fn applied(self) -> Option<T> {
        match self {
            BestEffort::Applied(value) => Some(value),
            BestEffort::Degraded { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            BestEffort::Applied(_) => None,
            BestEffort::Degraded { reason } => Some(reason),
        }
    }
}

impl<T, E: std::fmt::Display> From<Result<T, E>> for BestEffort<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => BestEffort::Applied(value),
            Err(e) => BestEffort::degraded(e.to_string()),
        }
    }
}

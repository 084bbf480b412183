use std::error::Error;
use std::fmt;

/// Errors surfaced to callers of the IK engine.
///
/// A solve that does not reach its target is *not* an error; the achieved
/// error travels with the result in [`crate::solver::SolveOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum IkError {
    /// Payload was not valid JSON.
    InvalidJson(String),
    /// `target` missing or not a three element numeric array.
    InvalidTarget,
    /// A required capability (interpolation, orientation) is not installed.
    CapabilityUnavailable(String),
    /// Anything that went wrong while solving or interpolating.
    SolveFailed(String),
    /// A hand-built chain violated the revolute/fixed invariant.
    InvalidChain(String),
}

impl IkError {
    /// Short code written to the `error` field of a failure response.
    pub fn code(&self) -> &'static str {
        match self {
            IkError::InvalidJson(_) => "Invalid JSON input",
            IkError::InvalidTarget => "Invalid target",
            IkError::CapabilityUnavailable(_) => "Capability unavailable",
            IkError::SolveFailed(_) => "IK failed",
            IkError::InvalidChain(_) => "Invalid chain",
        }
    }

    /// Optional human readable detail for the `details` field.
    pub fn details(&self) -> Option<&str> {
        match self {
            IkError::InvalidJson(_) | IkError::InvalidTarget => None,
            IkError::CapabilityUnavailable(msg)
            | IkError::SolveFailed(msg)
            | IkError::InvalidChain(msg) => Some(msg.as_str()),
        }
    }

    /// Process exit status used by the one-shot binary.
    pub fn exit_code(&self) -> i32 {
        match self {
            IkError::SolveFailed(_) => 2,
            _ => 1,
        }
    }
}

impl Error for IkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

impl fmt::Display for IkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            IkError::InvalidJson(ref msg) => write!(f, "Invalid JSON input: {}", msg),
            IkError::InvalidTarget => write!(f, "Invalid target"),
            IkError::CapabilityUnavailable(ref msg) => write!(f, "Capability unavailable: {}", msg),
            IkError::SolveFailed(ref msg) => write!(f, "IK failed: {}", msg),
            IkError::InvalidChain(ref msg) => write!(f, "Invalid chain: {}", msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_and_exit_status() {
        assert_eq!(IkError::InvalidTarget.code(), "Invalid target");
        assert_eq!(IkError::InvalidTarget.details(), None);
        assert_eq!(IkError::InvalidTarget.exit_code(), 1);

        let err = IkError::SolveFailed("non-finite joint value".to_string());
        assert_eq!(err.code(), "IK failed");
        assert_eq!(err.details(), Some("non-finite joint value"));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "IK failed: non-finite joint value");
    }
}

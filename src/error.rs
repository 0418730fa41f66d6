//! Error types
//!
//! Pool exhaustion is deliberately absent: a full pool is backpressure, not a
//! failure, and surfaces as `None` from `Pool::acquire`.

use std::fmt;

/// Failures inside the simulation core.
#[derive(Debug, Clone, PartialEq)]
pub enum SimError {
    /// A pool was looked up by a name that does not exist
    UnknownPool(String),
    /// An enemy archetype or power-up kind was looked up by an unknown name
    UnknownArchetype(String),
    /// A tick left state with NaN or infinite values
    NonFiniteState(&'static str),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownPool(name) => write!(f, "pool '{name}' does not exist"),
            Self::UnknownArchetype(name) => write!(f, "unknown archetype '{name}'"),
            Self::NonFiniteState(what) => write!(f, "non-finite simulation state: {what}"),
        }
    }
}

impl std::error::Error for SimError {}

/// Failures loading or validating a tuning file.
#[derive(Debug)]
pub enum TuningError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for TuningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read tuning file: {err}"),
            Self::Parse(err) => write!(f, "failed to parse tuning file: {err}"),
            Self::Invalid(reason) => write!(f, "invalid tuning: {reason}"),
        }
    }
}

impl std::error::Error for TuningError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for TuningError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<serde_json::Error> for TuningError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            SimError::UnknownPool("sparks".into()).to_string(),
            "pool 'sparks' does not exist"
        );
        assert!(
            TuningError::Invalid("arena width must be positive".into())
                .to_string()
                .contains("arena width")
        );
    }

    #[test]
    fn test_parse_error_has_source() {
        let err: TuningError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(std::error::Error::source(&err).is_some());
    }
}

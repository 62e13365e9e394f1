use thiserror::Error;

/// Fatal configuration problems, detected once before a run starts
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid population size: {0}")]
    InvalidPopulation(String),

    #[error("Invalid condition bits: {0}")]
    InvalidBits(String),

    #[error("Unknown signal bit: {0}")]
    UnknownBit(String),

    #[error("Inconsistent genetic algorithm pool: {0}")]
    InvalidPool(String),

    #[error("Probability {name} out of [0, 1]: {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl ConfigError {
    pub fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Check that `value` is a probability
    pub fn check_probability(name: &'static str, value: f64) -> ConfigResult<()> {
        if (0.0..=1.0).contains(&value) {
            Ok(())
        } else {
            Err(ConfigError::InvalidProbability { name, value })
        }
    }

    /// Check that `value` is finite and strictly positive
    pub fn check_positive(name: &'static str, value: f64) -> ConfigResult<()> {
        if value.is_finite() && value > 0.0 {
            Ok(())
        } else {
            Err(ConfigError::parameter(name, format!("must be positive, got {value}")))
        }
    }
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_probability() {
        assert!(ConfigError::check_probability("p", 0.0).is_ok());
        assert!(ConfigError::check_probability("p", 1.0).is_ok());
        assert_eq!(
            ConfigError::check_probability("p", 1.5),
            Err(ConfigError::InvalidProbability {
                name: "p",
                value: 1.5
            })
        );
    }

    #[test]
    fn test_check_positive_rejects_nan() {
        assert!(ConfigError::check_positive("x", f64::NAN).is_err());
        assert!(ConfigError::check_positive("x", 0.0).is_err());
        assert!(ConfigError::check_positive("x", 0.1).is_ok());
    }

    #[test]
    fn test_error_message() {
        let err = ConfigError::parameter("tauv", "must be positive");
        assert_eq!(err.to_string(), "Invalid parameter tauv: must be positive");
    }
}

use std::fmt;

use tapscript_core::error::{ConfigError, RunError};

#[derive(Debug)]
pub enum AutoError {
    /// The script has this many malformed lines.
    Parse { errors: usize },
    Config { message: String },
    Run(RunError),
    Io(std::io::Error),
}

impl AutoError {
    pub fn exit_code(&self) -> i32 {
        match self {
            AutoError::Parse { .. } => 2,
            AutoError::Config { .. } => 3,
            AutoError::Run(_) => 1,
            AutoError::Io(_) => 4,
        }
    }
}

impl fmt::Display for AutoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AutoError::Parse { errors } => write!(f, "Script has {} parse error(s)", errors),
            AutoError::Config { message } => write!(f, "Config error: {}", message),
            AutoError::Run(e) => write!(f, "Run failed: {}", e),
            AutoError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for AutoError {}

impl From<std::io::Error> for AutoError {
    fn from(e: std::io::Error) -> Self {
        AutoError::Io(e)
    }
}

impl From<ConfigError> for AutoError {
    fn from(e: ConfigError) -> Self {
        AutoError::Config { message: e.to_string() }
    }
}

impl From<RunError> for AutoError {
    fn from(e: RunError) -> Self {
        AutoError::Run(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AutoError::Parse { errors: 1 }.exit_code(), 2);
        assert_eq!(
            AutoError::Config {
                message: "bad".to_string()
            }
            .exit_code(),
            3
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(AutoError::from(io).exit_code(), 4);
    }

    #[test]
    fn test_config_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = AutoError::from(ConfigError::from(json_err));
        assert!(err.to_string().starts_with("Config error: invalid config"));
    }
}

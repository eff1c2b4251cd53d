use thiserror::Error;

pub type Result<T> = std::result::Result<T, ParamError>;

/// Fatal failures of the parameter build and its collaborators
#[derive(Error, Debug)]
pub enum ParamError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration error: missing parameter {key} ({description})")]
    MissingKey { key: String, description: String },

    #[error("Configuration error: parameter {key} is not a {expected}")]
    InvalidValue { key: String, expected: &'static str },

    #[error("Input error: {0}")]
    Input(String),

    #[error("Import error: {0}")]
    Import(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Integration error: {0}")]
    Integration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParamError {
    /// True for errors caused by the configuration record itself
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ParamError::Configuration(_)
                | ParamError::MissingKey { .. }
                | ParamError::InvalidValue { .. }
        )
    }
}

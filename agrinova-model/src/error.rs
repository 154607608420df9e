use std::fmt::{self, Display};

/// Errors produced when wire strings are converted into closed model types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    UnknownRole(String),
    UnknownPlatform(String),
    UnknownLoginMethod(String),
    UnknownTokenType(String),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::UnknownRole(raw) => write!(f, "unknown role: {raw}"),
            ModelError::UnknownPlatform(raw) => {
                write!(f, "unknown platform: {raw}")
            }
            ModelError::UnknownLoginMethod(raw) => {
                write!(f, "unknown login method: {raw}")
            }
            ModelError::UnknownTokenType(raw) => {
                write!(f, "unknown token type: {raw}")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;

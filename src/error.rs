use thiserror::Error;

pub type Result<T> = std::result::Result<T, PixelMetricError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PixelMetricError {
    #[error("Missing required header keyword: {key}")]
    MissingMetadataKey { key: String },

    #[error("Invalid value for {name}: {message}")]
    InvalidArgument { name: String, message: String },
}

impl PixelMetricError {
    pub fn missing_key(key: impl Into<String>) -> Self {
        Self::MissingMetadataKey { key: key.into() }
    }

    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }
}

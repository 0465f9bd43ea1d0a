pub type SynthResult<T> = Result<T, SynthError>;

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    /// Rule data breaks an alignment or uniqueness invariant.
    #[error("validation error: {0}")]
    Validation(String),

    /// A state, model or texture could not be found by the host.
    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SynthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for SynthError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde(err.to_string())
    }
}

/// Convenience result type used across scenefx.
pub type FxResult<T> = Result<T, FxError>;

/// Top-level error taxonomy used by the filter pipeline.
///
/// Skipped frames (incompatible backends, off-screen bounds, disabled chains) are not errors and
/// never surface here.
#[derive(thiserror::Error, Debug)]
pub enum FxError {
    /// Invalid user-provided data: filter parameters, texture sizes, filter specs.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures reported by a render backend or by calling the pipeline out of order.
    #[error("backend error: {0}")]
    Backend(String),

    /// Errors when serializing or deserializing filter configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FxError {
    /// Build a [`FxError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FxError::Backend`] value.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Build a [`FxError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for FxError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

/// Convenience result type used across flipbook.
pub type FlipbookResult<T> = Result<T, FlipbookError>;

/// Top-level error taxonomy used by engine APIs.
///
/// Cancellation of generation or export is not an error and never surfaces here.
#[derive(thiserror::Error, Debug)]
pub enum FlipbookError {
    /// Invalid caller-provided data (sizes, counts, rates, indices passed to fallible APIs).
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures while rasterizing strokes or resampling bitmaps.
    #[error("render error: {0}")]
    Render(String),

    /// Failures while encoding or decoding bitmaps and animated images.
    #[error("encode error: {0}")]
    Encode(String),

    /// Filesystem failures surfaced to the caller (artifact directories, export files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FlipbookError {
    /// Build a [`FlipbookError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FlipbookError::Render`] value.
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }

    /// Build a [`FlipbookError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;

//! Central error handling for the shadow pipeline.
//!
//! Provides a unified ShadowError enum with consistent categorization;
//! library code propagates these with `?` rather than panicking.

/// Centralized error type for all pipeline operations
#[derive(thiserror::Error, Debug)]
pub enum ShadowError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("device error: {0}")]
    Device(String),

    #[error("render error: {0}")]
    Render(String),
}

impl ShadowError {
    /// Convenience constructors for common error types
    pub fn config<T: ToString>(msg: T) -> Self {
        ShadowError::Config(msg.to_string())
    }

    pub fn device<T: ToString>(msg: T) -> Self {
        ShadowError::Device(msg.to_string())
    }

    pub fn render<T: ToString>(msg: T) -> Self {
        ShadowError::Render(msg.to_string())
    }
}

/// Result type alias for pipeline operations
pub type ShadowResult<T> = Result<T, ShadowError>;

/// Errors raised while turning a [`crate::MetricSample`] into its wire form
/// (or back).
///
/// # Examples
///
/// ```rust
/// use hostmon_common::EncodeError;
///
/// let err = EncodeError::NonFinite { key: "cpu.user".to_string() };
/// assert!(err.to_string().contains("cpu.user"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// A gauge held NaN or an infinity, which JSON cannot represent.
    #[error("metric '{key}' has a non-finite value")]
    NonFinite { key: String },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` alias for encoding operations.
pub type Result<T> = std::result::Result<T, EncodeError>;

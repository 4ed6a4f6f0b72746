use std::path::PathBuf;

/// Errors that can occur while sampling host counters.
///
/// # Examples
///
/// ```rust
/// use hostmon_collector::CollectError;
///
/// let err = CollectError::Parse {
///     path: "/proc/stat".into(),
///     reason: "missing aggregate cpu line".to_string(),
/// };
/// assert!(err.to_string().contains("/proc/stat"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// The counter file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The counter file was read but its contents were not in the expected format.
    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },
}

/// Convenience `Result` alias for collection operations.
pub type Result<T> = std::result::Result<T, CollectError>;

pub(crate) fn read_counter_file(path: PathBuf) -> Result<String> {
    std::fs::read_to_string(&path).map_err(|source| CollectError::Io { path, source })
}

//! Error types for the scheduler

use thiserror::Error;

/// Scheduler errors; only registry persistence is fallible.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Reading or writing the conflict history file failed
    #[error("conflict history i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The conflict history file is malformed
    #[error("corrupt conflict history: {0}")]
    Corrupt(&'static str),
}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SchedulerError::Corrupt("truncated record");
        assert!(err.to_string().contains("truncated record"));

        let err = SchedulerError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert!(err.to_string().contains("i/o"));
    }
}

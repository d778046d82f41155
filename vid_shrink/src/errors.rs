use shared_utils::ProbeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrinkError {
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unsupported output format: {0} (expected mp4, webm or gif)")]
    UnsupportedFormat(String),

    #[error("Unknown quality level: {0} (expected high, medium, low or ultra-low)")]
    InvalidQuality(String),

    #[error("Could not read video info: {0}")]
    Probe(#[from] ProbeError),

    #[error("Encoding failed with exit code {}: {detail}", .exit_code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    EncodeFailed {
        exit_code: Option<i32>,
        detail: String,
    },

    #[error("Encoder exited successfully but produced no output at {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("FFmpeg process error: {0:#}")]
    Process(anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ShrinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_failed_message() {
        let err = ShrinkError::EncodeFailed {
            exit_code: Some(187),
            detail: "Conversion failed!".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Encoding failed with exit code 187: Conversion failed!"
        );

        let killed = ShrinkError::EncodeFailed {
            exit_code: None,
            detail: "terminated".to_string(),
        };
        assert!(killed.to_string().contains("exit code none"));
    }

    #[test]
    fn test_probe_error_converts() {
        let err: ShrinkError = ProbeError::NoVideoStream("a.m4a".to_string()).into();
        assert!(matches!(err, ShrinkError::Probe(_)));
        assert!(err.to_string().contains("a.m4a"));
    }
}

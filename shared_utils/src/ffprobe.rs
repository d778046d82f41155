//! FFprobe wrapper module
//!
//! Runs `ffprobe` in JSON mode and reduces its output to the handful of
//! fields the encoder front-end needs.

use serde::Deserialize;
use serde_json::Value;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("FFprobe failed: {0}")]
    ExecutionFailed(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No video stream found in {0}")]
    NoVideoStream(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Source metadata used by the preset resolver, estimator and final report.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub width: u32,
    pub height: u32,
    /// Seconds.
    pub duration: f64,
    /// Bytes, as reported by the container.
    pub size: u64,
    pub frame_rate: f64,
    pub codec: String,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<Value>,
    size: Option<Value>,
}

/// Resolve `program` to an executable, either a bare name looked up on
/// `PATH` or an explicit path.
pub fn locate_tool(program: &Path) -> Option<PathBuf> {
    which::which(program).ok()
}

/// Probe `path` with the given `ffprobe` executable.
pub fn probe_media(ffprobe: &Path, path: &Path) -> Result<MediaInfo, ProbeError> {
    let program = locate_tool(ffprobe).ok_or_else(|| {
        ProbeError::ToolNotFound(format!(
            "{} not found. Install ffmpeg (e.g. brew install ffmpeg)",
            ffprobe.display()
        ))
    })?;

    if !path.is_file() {
        return Err(ProbeError::ExecutionFailed(format!(
            "Not a readable file: {}",
            path.display()
        )));
    }

    debug!(program = %program.display(), input = %path.display(), "Running ffprobe");

    let output = Command::new(&program)
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let message = if stderr.trim().is_empty() {
            format!(
                "ffprobe failed to analyze file: {} (exit code: {:?})",
                path.display(),
                output.status.code()
            )
        } else {
            format!("ffprobe error for '{}': {}", path.display(), stderr.trim())
        };
        return Err(ProbeError::ExecutionFailed(message));
    }

    let json = String::from_utf8_lossy(&output.stdout);
    parse_probe_output(&json, &path.display().to_string())
}

/// Extract [`MediaInfo`] from ffprobe's `-show_format -show_streams` JSON.
///
/// `source` only labels errors.
pub fn parse_probe_output(json: &str, source: &str) -> Result<MediaInfo, ProbeError> {
    let parsed: ProbeOutput =
        serde_json::from_str(json).map_err(|e| ProbeError::Parse(e.to_string()))?;

    let format = parsed
        .format
        .ok_or_else(|| ProbeError::Parse(format!("missing format section for {}", source)))?;

    let video = parsed
        .streams
        .into_iter()
        .find(|s| s.codec_type.as_deref() == Some("video"))
        .ok_or_else(|| ProbeError::NoVideoStream(source.to_string()))?;

    let frame_rate = match video.r_frame_rate.as_deref() {
        Some(raw) => parse_frame_rate(raw),
        None => FALLBACK_FRAME_RATE,
    };

    Ok(MediaInfo {
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        duration: format.duration.as_ref().and_then(value_as_f64).unwrap_or(0.0),
        size: format.size.as_ref().and_then(value_as_u64).unwrap_or(0),
        frame_rate,
        codec: video.codec_name.unwrap_or_else(|| "unknown".to_string()),
    })
}

fn value_as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn value_as_u64(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => s.trim().parse::<u64>().ok(),
        Value::Number(n) => n.as_u64(),
        _ => None,
    }
}

pub const FALLBACK_FRAME_RATE: f64 = 30.0;

/// Parse ffprobe's rational frame rate (`"30000/1001"`) or a plain number.
///
/// Anything unparseable, a zero denominator, or a non-positive rate yields
/// [`FALLBACK_FRAME_RATE`].
pub fn parse_frame_rate(s: &str) -> f64 {
    let s = s.trim();
    let rate = match s.split_once('/') {
        Some((num, den)) => match (num.trim().parse::<f64>(), den.trim().parse::<f64>()) {
            (Ok(num), Ok(den)) if den != 0.0 => Some(num / den),
            _ => None,
        },
        None => s.parse::<f64>().ok(),
    };

    match rate {
        Some(r) if r.is_finite() && r > 0.0 => r,
        _ => {
            if !s.is_empty() && s != "0/0" {
                warn!(raw = s, fallback = FALLBACK_FRAME_RATE, "Unparseable frame rate");
            }
            FALLBACK_FRAME_RATE
        }
    }
}

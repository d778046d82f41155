//! Encoding presets
//!
//! Maps a mode (`fast` / `tiny` / `quality` / `custom`) plus optional user
//! overrides to concrete [`EncodingParameters`].

use crate::command::OutputFormat;
use crate::errors::ShrinkError;
use clap::ValueEnum;
use std::fmt;
use std::str::FromStr;

/// Height cap for `quality` mode.
pub const QUALITY_MODE_MAX_HEIGHT: u32 = 1080;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum QualityTier {
    High,
    Medium,
    Low,
    #[value(name = "ultra-low")]
    UltraLow,
}

impl QualityTier {
    pub const ALL: [QualityTier; 4] = [
        QualityTier::High,
        QualityTier::Medium,
        QualityTier::Low,
        QualityTier::UltraLow,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::High => "high",
            QualityTier::Medium => "medium",
            QualityTier::Low => "low",
            QualityTier::UltraLow => "ultra-low",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Same names the CLI accepts through `ValueEnum`, for library callers
/// holding plain strings.
impl FromStr for QualityTier {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        QualityTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| ShrinkError::InvalidQuality(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// 720p, 15 fps, medium
    Fast,
    /// 480p, 10 fps, low
    Tiny,
    /// up to 1080p, 24 fps, high
    Quality,
    /// Explicit settings only; defaults as `Fast`.
    Custom,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Fast => "fast",
            Mode::Tiny => "tiny",
            Mode::Quality => "quality",
            Mode::Custom => "custom",
        }
    }

    /// (height, fps, quality) used when no override is given.
    pub fn defaults(self, source_height: u32) -> (u32, u32, QualityTier) {
        match self {
            Mode::Fast | Mode::Custom => (720, 15, QualityTier::Medium),
            Mode::Tiny => (480, 10, QualityTier::Low),
            Mode::Quality => (
                source_height.min(QUALITY_MODE_MAX_HEIGHT),
                24,
                QualityTier::High,
            ),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied values that beat the mode defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overrides {
    pub height: Option<u32>,
    pub fps: Option<u32>,
    pub quality: Option<QualityTier>,
}

/// Optional sub-range of the source, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Trim {
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Trim {
    pub fn validate(&self) -> Result<(), ShrinkError> {
        if let Some(start) = self.start {
            if !start.is_finite() || start < 0.0 {
                return Err(ShrinkError::InvalidArgument(format!(
                    "start time must be a non-negative number of seconds, got {}",
                    start
                )));
            }
        }
        if let Some(end) = self.end {
            let start = self.start.unwrap_or(0.0);
            if !end.is_finite() || end <= start {
                return Err(ShrinkError::InvalidArgument(format!(
                    "end time ({}) must be after start time ({})",
                    end, start
                )));
            }
        }
        Ok(())
    }

    /// Length passed to `-t`, when an end is set.
    pub fn duration(&self) -> Option<f64> {
        self.end.map(|end| end - self.start.unwrap_or(0.0))
    }
}

/// Fully resolved settings for one encode. Built once by [`resolve_parameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingParameters {
    pub height: u32,
    pub fps: u32,
    pub quality: QualityTier,
    pub format: OutputFormat,
    pub trim: Trim,
    /// Hardware encoding requested; only honoured for mp4 when available.
    pub use_hardware: bool,
}

pub fn resolve_parameters(
    mode: Mode,
    overrides: Overrides,
    source_height: u32,
    format: OutputFormat,
    trim: Trim,
    use_hardware: bool,
) -> EncodingParameters {
    let (height, fps, quality) = mode.defaults(source_height);
    EncodingParameters {
        height: overrides.height.unwrap_or(height),
        fps: overrides.fps.unwrap_or(fps),
        quality: overrides.quality.unwrap_or(quality),
        format,
        trim,
        use_hardware,
    }
}

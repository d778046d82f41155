//! Hardware encoder detection
//!
//! Only Apple VideoToolbox H.264 is recognised. Everything else, including a
//! missing or broken ffmpeg, is treated as software-only encoding.

use std::path::Path;
use std::process::Command;
use tracing::{debug, info};

/// ffmpeg name of the hardware H.264 encoder.
pub const HW_H264_ENCODER: &str = "h264_videotoolbox";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HardwareSupport {
    /// Apple VideoToolbox
    VideoToolbox,
    /// CPU only
    Software,
}

impl HardwareSupport {
    pub fn is_available(self) -> bool {
        self == HardwareSupport::VideoToolbox
    }
}

impl std::fmt::Display for HardwareSupport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HardwareSupport::VideoToolbox => write!(f, "VideoToolbox (Apple GPU)"),
            HardwareSupport::Software => write!(f, "Software (CPU)"),
        }
    }
}

/// Ask `ffmpeg -encoders` whether the hardware encoder is compiled in.
pub fn detect_hardware(ffmpeg: &Path) -> HardwareSupport {
    let output = Command::new(ffmpeg)
        .arg("-hide_banner")
        .arg("-encoders")
        .output();

    let support = match output {
        Ok(out) => scan_encoder_list(&String::from_utf8_lossy(&out.stdout)),
        Err(e) => {
            debug!(error = %e, program = %ffmpeg.display(), "Encoder listing unavailable");
            HardwareSupport::Software
        }
    };

    info!(support = %support, "Hardware capability check finished");
    support
}

/// Scan the text printed by `ffmpeg -encoders`.
pub fn scan_encoder_list(listing: &str) -> HardwareSupport {
    if listing.contains(HW_H264_ENCODER) {
        HardwareSupport::VideoToolbox
    } else {
        HardwareSupport::Software
    }
}

//! Output size estimate
//!
//! A rough heuristic: compare source and target pixel rates, then scale by a
//! per-tier weight. It has never been calibrated against real encodes and is
//! shown for information only.

use crate::preset::{EncodingParameters, QualityTier};
use shared_utils::MediaInfo;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeEstimate {
    /// Expected `source / output` size ratio.
    pub ratio: f64,
    /// Expected output size in bytes.
    pub size: u64,
}

pub fn quality_weight(quality: QualityTier) -> f64 {
    match quality {
        QualityTier::High => 2.0,
        QualityTier::Medium => 5.0,
        QualityTier::Low => 10.0,
        QualityTier::UltraLow => 20.0,
    }
}

/// Target pixel rate assuming a 16:9 frame.
pub fn target_pixel_rate(height: u32, fps: u32) -> f64 {
    let h = height as f64;
    (h * 16.0 / 9.0) * h * fps as f64
}

pub fn estimate_output(info: &MediaInfo, params: &EncodingParameters) -> SizeEstimate {
    let source_rate = info.width as f64 * info.height as f64 * info.frame_rate;
    let target_rate = target_pixel_rate(params.height, params.fps);
    let pixel_ratio = if target_rate > 0.0 {
        source_rate / target_rate
    } else {
        1.0
    };

    let ratio = pixel_ratio * quality_weight(params.quality) / 5.0;
    let size = if ratio > 0.0 && ratio.is_finite() {
        (info.size as f64 / ratio) as u64
    } else {
        info.size
    };

    SizeEstimate { ratio, size }
}

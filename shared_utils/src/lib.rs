//! Shared Utilities for vid-shrink
//!
//! - FFprobe wrapper for source metadata
//! - Hardware encoder detection
//! - FFmpeg process supervision and status-line parsing
//! - Progress bars and size/duration formatting
//! - Logging setup

pub mod ffmpeg_process;
pub mod ffprobe;
pub mod gpu_accel;
pub mod logging;
pub mod progress;

pub use ffmpeg_process::{
    format_ffmpeg_error, get_error_suggestion, is_progress_line, truncate_line, FfmpegProcess,
    ProgressStats,
};
pub use ffprobe::{
    locate_tool, parse_frame_rate, parse_probe_output, probe_media,
    MediaInfo, ProbeError,
};
pub use gpu_accel::{detect_hardware, scan_encoder_list, HardwareSupport};
pub use progress::{create_encode_bar, create_spinner, format_duration, format_size};

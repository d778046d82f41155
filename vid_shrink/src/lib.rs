//! vid-shrink - quick video size reduction on top of ffmpeg
//!
//! Re-encodes a video at a lower resolution, frame rate and bitrate:
//! - MP4 / H.264 (VideoToolbox when available, libx264 otherwise)
//! - WebM / VP9
//! - GIF with a generated palette
//!
//! ## Simple Mode
//! ```rust,ignore
//! use vid_shrink::{compress_video, CompressRequest, Mode};
//!
//! let mut request = CompressRequest::new("video.mp4".into());
//! request.mode = Mode::Tiny;
//! compress_video(&request)?;
//! ```

pub mod command;
pub mod conversion_api;
pub mod errors;
pub mod estimate;
pub mod preset;
pub mod runner;

pub use command::{build_command, EncodeCommand, OutputFormat};
pub use conversion_api::{
    compress_video, default_output_path, CompressOutcome, CompressRequest, ToolPaths,
};
pub use errors::{Result, ShrinkError};
pub use estimate::{estimate_output, SizeEstimate};
pub use preset::{resolve_parameters, EncodingParameters, Mode, Overrides, QualityTier, Trim};
pub use runner::{run_command, EncodeReport, ProgressEvent, RunOutcome};
pub use shared_utils::{HardwareSupport, MediaInfo};

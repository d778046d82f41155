//! Conversion API - one input file through probe, preset, build, run
//!
//! ## Usage
//! ```rust,ignore
//! use vid_shrink::{compress_video, CompressRequest};
//!
//! let request = CompressRequest::new("talk.mov".into());
//! compress_video(&request)?;
//! ```

use crate::command::{build_command, uses_hardware_encoder, EncodeCommand, OutputFormat};
use crate::errors::{Result, ShrinkError};
use crate::estimate::{estimate_output, SizeEstimate};
use crate::preset::{resolve_parameters, EncodingParameters, Mode, Overrides, Trim};
use crate::runner::{run_command, EncodeReport, ProgressEvent};
use console::style;
use indicatif::ProgressBar;
use shared_utils::progress::ENCODE_BAR_STEPS;
use shared_utils::{
    create_encode_bar, create_spinner, detect_hardware, format_duration, format_size,
    probe_media, HardwareSupport, MediaInfo,
};
use std::path::{Path, PathBuf};
use tracing::info;

/// Executables used for probing and encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompressRequest {
    pub input: PathBuf,
    /// Defaults to [`default_output_path`].
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub mode: Mode,
    pub overrides: Overrides,
    pub trim: Trim,
    /// Skip hardware detection and encode on the CPU.
    pub no_hw: bool,
    /// Print the command instead of running it.
    pub preview: bool,
    pub tools: ToolPaths,
    /// Suppress the live progress bar.
    pub hide_progress: bool,
}

impl CompressRequest {
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            output: None,
            format: OutputFormat::default(),
            mode: Mode::Fast,
            overrides: Overrides::default(),
            trim: Trim::default(),
            no_hw: false,
            preview: false,
            tools: ToolPaths::default(),
            hide_progress: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompressOutcome {
    Previewed {
        command: EncodeCommand,
    },
    Encoded {
        output: PathBuf,
        report: EncodeReport,
    },
}

/// `<dir>/<stem>_<mode>.<ext>` next to the input.
pub fn default_output_path(input: &Path, mode: Mode, format: OutputFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let file_name = format!("{}_{}.{}", stem, mode.as_str(), format.extension());
    match input.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Validate everything that can be checked without running a tool.
pub fn validate_request(request: &CompressRequest) -> Result<()> {
    if !request.input.is_file() {
        return Err(ShrinkError::InputNotFound(request.input.clone()));
    }
    request.trim.validate()?;
    if request.overrides.height == Some(0) || request.overrides.fps == Some(0) {
        return Err(ShrinkError::InvalidArgument(
            "resolution and fps must be at least 1".to_string(),
        ));
    }
    Ok(())
}

pub fn compress_video(request: &CompressRequest) -> Result<CompressOutcome> {
    validate_request(request)?;

    let media = probe_media(&request.tools.ffprobe, &request.input)?;
    info!(input = %request.input.display(), ?media, "Probed source");
    print_media_info(&media);

    let hardware = if request.no_hw {
        HardwareSupport::Software
    } else {
        detect_hardware(&request.tools.ffmpeg)
    };

    let params = resolve_parameters(
        request.mode,
        request.overrides,
        media.height,
        request.format,
        request.trim,
        !request.no_hw,
    );
    let encoder_on_gpu = uses_hardware_encoder(&params, hardware);
    print_encoder_mode(hardware, encoder_on_gpu);

    let estimate = estimate_output(&media, &params);
    print_settings(&params, &estimate);

    let output = request
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&request.input, request.mode, request.format));

    let command = build_command(
        &request.tools.ffmpeg,
        &request.input,
        &output,
        &params,
        hardware,
    );
    println!();
    println!("{}", style("🔧 FFmpeg command:").bold());
    println!("   {}", command.display());
    println!();

    if request.preview {
        println!("⏸️  Preview only, nothing was encoded");
        return Ok(CompressOutcome::Previewed { command });
    }

    println!("⏳ Compressing...");
    let expected_secs = expected_output_duration(&media, &params);
    let bar = if expected_secs > 0.0 {
        create_encode_bar("Encoding", request.hide_progress)
    } else {
        create_spinner("Encoding", request.hide_progress)
    };

    let result = run_command(&command, &output, |event| {
        render_event(&bar, event, expected_secs)
    });
    bar.finish_and_clear();

    let report = result?.report(&media);
    print_result(&output, &report);

    Ok(CompressOutcome::Encoded { output, report })
}

/// Seconds of source the encode will cover, for the progress bar.
fn expected_output_duration(media: &MediaInfo, params: &EncodingParameters) -> f64 {
    let remaining = (media.duration - params.trim.start.unwrap_or(0.0)).max(0.0);
    match params.trim.duration() {
        Some(d) => d.min(remaining),
        None => remaining,
    }
}

fn render_event(bar: &ProgressBar, event: &ProgressEvent, expected_secs: f64) {
    match event {
        ProgressEvent::Started { command } => {
            info!(command = %command, "Encode started");
        }
        ProgressEvent::Progress { line, stats } => {
            if let Some(fraction) = stats.fraction(expected_secs) {
                bar.set_position((fraction * ENCODE_BAR_STEPS as f64) as u64);
            }
            bar.set_message(line.clone());
        }
        ProgressEvent::Finished { exit_code, elapsed } => {
            info!(?exit_code, elapsed_secs = elapsed.as_secs_f64(), "Encoder exited");
        }
    }
}

fn print_media_info(media: &MediaInfo) {
    println!();
    println!("{}", style("📹 Source video:").bold());
    println!("   Resolution: {}x{}", media.width, media.height);
    println!("   Duration:   {:.1}s", media.duration);
    println!("   Frame rate: {:.1} fps", media.frame_rate);
    println!("   Size:       {}", format_size(media.size));
    println!("   Codec:      {}", media.codec);
}

fn print_encoder_mode(hardware: HardwareSupport, encoder_on_gpu: bool) {
    match (hardware, encoder_on_gpu) {
        (HardwareSupport::VideoToolbox, true) => {
            println!("   🚀 Hardware acceleration: {}", hardware)
        }
        (HardwareSupport::VideoToolbox, false) => {
            println!("   💻 Encoding: software (hardware encoder not used for this format)")
        }
        (HardwareSupport::Software, _) => println!("   💻 Encoding: software"),
    }
}

fn print_settings(params: &EncodingParameters, estimate: &SizeEstimate) {
    println!();
    println!("{}", style("⚙️  Settings:").bold());
    println!("   Target height:  {}p", params.height);
    println!("   Target fps:     {}", params.fps);
    println!("   Quality:        {}", params.quality);
    println!("   Output format:  {}", params.format);
    println!("   Estimated ratio: ~1/{:.0}", estimate.ratio);
    println!("   Estimated size:  ~{}", format_size(estimate.size));
}

fn print_result(output: &Path, report: &EncodeReport) {
    println!();
    println!(
        "{} in {}",
        style("✅ Compression complete!").green().bold(),
        format_duration(report.elapsed)
    );
    println!("   Output:  {}", output.display());
    println!("   Size:    {}", format_size(report.output_size));
    println!(
        "   Ratio:   1/{:.1} ({:.0}% smaller)",
        report.ratio, report.reduction_percent
    );
    println!("   Speed:   {:.1}x realtime", report.speed);
}

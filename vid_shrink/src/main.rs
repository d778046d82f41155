use clap::{ArgGroup, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::{debug, Level};

use vid_shrink::{
    compress_video, CompressRequest, Mode, OutputFormat, Overrides, QualityTier, ToolPaths, Trim,
};

const MODES_HELP: &str = "\
Modes:
  --fast      720p, 15 fps, medium quality (default, roughly 1/10 of the size)
  --tiny      480p, 10 fps, low quality (1/20 or smaller)
  --quality   up to 1080p, 24 fps, high quality (roughly 1/5)

Examples:
  vid-shrink video.mp4 --fast
  vid-shrink video.mp4 --tiny
  vid-shrink video.mp4 --fast -f webm
  vid-shrink video.mp4 --resolution 360
  vid-shrink video.mp4 -f gif --start 10 --end 15";

#[derive(Parser)]
#[command(name = "vid-shrink")]
#[command(version, about = "Fast video compression on top of ffmpeg", long_about = None)]
#[command(after_help = MODES_HELP)]
#[command(group(ArgGroup::new("mode").multiple(false)))]
struct Cli {
    #[arg(value_name = "INPUT")]
    input: PathBuf,
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Mp4)]
    format: OutputFormat,

    /// 720p, 15 fps, medium quality
    #[arg(long, group = "mode")]
    fast: bool,
    /// 480p, 10 fps, low quality
    #[arg(long, group = "mode")]
    tiny: bool,
    /// Up to 1080p, 24 fps, high quality
    #[arg(long, group = "mode")]
    quality: bool,

    /// Target height in pixels (e.g. 720, 480, 360)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    resolution: Option<u32>,
    /// Target frame rate (e.g. 24, 15, 10)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    fps: Option<u32>,
    #[arg(short = 'q', long = "quality-level", value_enum)]
    quality_level: Option<QualityTier>,

    /// Start time in seconds
    #[arg(long)]
    start: Option<f64>,
    /// End time in seconds
    #[arg(long)]
    end: Option<f64>,

    /// Disable hardware acceleration
    #[arg(long)]
    no_hw: bool,
    /// Print the ffmpeg command without running it
    #[arg(long)]
    preview: bool,
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_name = "PATH", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
    #[arg(long, value_name = "PATH", default_value = "ffprobe")]
    ffprobe: PathBuf,
}

impl Cli {
    fn mode(&self) -> Mode {
        if self.tiny {
            Mode::Tiny
        } else if self.quality {
            Mode::Quality
        } else {
            Mode::Fast
        }
    }

    fn into_request(self) -> CompressRequest {
        let mode = self.mode();
        CompressRequest {
            input: self.input,
            output: self.output,
            format: self.format,
            mode,
            overrides: Overrides {
                height: self.resolution,
                fps: self.fps,
                quality: self.quality_level,
            },
            trim: Trim {
                start: self.start,
                end: self.end,
            },
            no_hw: self.no_hw,
            preview: self.preview,
            tools: ToolPaths {
                ffmpeg: self.ffmpeg,
                ffprobe: self.ffprobe,
            },
            hide_progress: !std::io::stderr().is_terminal(),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let stderr_level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    if let Err(e) = shared_utils::logging::init_logging(
        "vid_shrink",
        shared_utils::logging::LogConfig::default().with_stderr_level(stderr_level),
    ) {
        eprintln!("⚠️  Could not initialise logging: {:#}", e);
    }

    let request = cli.into_request();
    debug!(?request, "Parsed request");

    if let Err(e) = compress_video(&request) {
        eprintln!();
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults_to_fast_mp4() {
        let cli = Cli::try_parse_from(["vid-shrink", "in.mov"]).unwrap();
        let request = cli.into_request();
        assert_eq!(request.mode, Mode::Fast);
        assert_eq!(request.format, OutputFormat::Mp4);
        assert_eq!(request.tools, ToolPaths::default());
        assert!(!request.preview && !request.no_hw);
    }

    #[test]
    fn test_parses_all_options() {
        let cli = Cli::try_parse_from([
            "vid-shrink",
            "in.mov",
            "-o",
            "out.webm",
            "-f",
            "webm",
            "--tiny",
            "--resolution",
            "360",
            "--fps",
            "12",
            "-q",
            "ultra-low",
            "--start",
            "1.5",
            "--end",
            "4",
            "--no-hw",
            "--preview",
        ])
        .unwrap();
        let request = cli.into_request();
        assert_eq!(request.mode, Mode::Tiny);
        assert_eq!(request.format, OutputFormat::Webm);
        assert_eq!(request.output, Some(PathBuf::from("out.webm")));
        assert_eq!(request.overrides.height, Some(360));
        assert_eq!(request.overrides.fps, Some(12));
        assert_eq!(request.overrides.quality, Some(QualityTier::UltraLow));
        assert_eq!(request.trim.start, Some(1.5));
        assert_eq!(request.trim.end, Some(4.0));
        assert!(request.no_hw && request.preview);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Cli::try_parse_from(["vid-shrink", "in.mov", "-f", "avi"]).is_err());
        assert!(Cli::try_parse_from(["vid-shrink", "in.mov", "-q", "best"]).is_err());
        assert!(Cli::try_parse_from(["vid-shrink", "in.mov", "--fps", "0"]).is_err());
        assert!(Cli::try_parse_from(["vid-shrink", "in.mov", "--fast", "--tiny"]).is_err());
    }
}

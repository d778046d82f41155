//! ffmpeg command construction
//!
//! Pure: nothing here spawns a process. The same inputs always produce the
//! same token sequence.

use crate::errors::ShrinkError;
use crate::preset::{EncodingParameters, QualityTier};
use clap::ValueEnum;
use shared_utils::gpu_accel::{HardwareSupport, HW_H264_ENCODER};
use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

pub const SW_H264_ENCODER: &str = "libx264";
pub const VP9_ENCODER: &str = "libvpx-vp9";
pub const GIF_MAX_COLORS: u32 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
    Gif,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Same names the CLI accepts through `ValueEnum`, for library callers
/// holding plain strings.
impl FromStr for OutputFormat {
    type Err = ShrinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mp4" => Ok(OutputFormat::Mp4),
            "webm" => Ok(OutputFormat::Webm),
            "gif" => Ok(OutputFormat::Gif),
            other => Err(ShrinkError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// VideoToolbox has no CRF mode; quality is a target bitrate.
pub fn videotoolbox_bitrate(quality: QualityTier) -> &'static str {
    match quality {
        QualityTier::High => "2M",
        QualityTier::Medium => "1M",
        QualityTier::Low => "500k",
        QualityTier::UltraLow => "250k",
    }
}

pub fn x264_crf(quality: QualityTier) -> u8 {
    match quality {
        QualityTier::High => 23,
        QualityTier::Medium => 28,
        QualityTier::Low => 35,
        QualityTier::UltraLow => 42,
    }
}

pub fn vp9_crf(quality: QualityTier) -> u8 {
    match quality {
        QualityTier::High => 30,
        QualityTier::Medium => 40,
        QualityTier::Low => 50,
        QualityTier::UltraLow => 55,
    }
}

/// Whether `params` end up on the hardware encoder.
pub fn uses_hardware_encoder(params: &EncodingParameters, hardware: HardwareSupport) -> bool {
    params.format == OutputFormat::Mp4 && params.use_hardware && hardware.is_available()
}

/// Seconds as ffmpeg accepts them, always with a fractional part (`5.0`).
pub fn format_seconds(secs: f64) -> String {
    format!("{:?}", secs)
}

/// Program plus argument tokens for one ffmpeg invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl EncodeCommand {
    /// Wrap an arbitrary invocation; [`build_command`] is the normal entry point.
    pub fn from_parts(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Value following `flag`, e.g. `arg_value("-crf")`.
    pub fn arg_value(&self, flag: &str) -> Option<&str> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(String::as_str)
    }

    pub fn has_arg(&self, token: &str) -> bool {
        self.args.iter().any(|a| a == token)
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.args.iter().map(OsStr::new));
        cmd
    }

    /// One-line, shell-pasteable rendering.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .map(|token| shell_quote(&token))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for EncodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn shell_quote(token: &str) -> String {
    let safe = !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_alphanumeric() || "-_./:=,+@%".contains(c));
    if safe {
        token.to_string()
    } else {
        format!("'{}'", token.replace('\'', r"'\''"))
    }
}

/// Assemble the ffmpeg invocation:
/// `ffmpeg -y [-ss START] -i INPUT [-t DURATION] <codec args> OUTPUT`.
///
/// `-ss` goes before `-i` so ffmpeg seeks the input instead of decoding up
/// to the start point.
pub fn build_command(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    params: &EncodingParameters,
    hardware: HardwareSupport,
) -> EncodeCommand {
    let mut args: Vec<String> = vec!["-y".into()];

    if let Some(start) = params.trim.start {
        args.extend(["-ss".into(), format_seconds(start)]);
    }
    args.extend(["-i".into(), input.to_string_lossy().into_owned()]);
    if let Some(duration) = params.trim.duration() {
        args.extend(["-t".into(), format_seconds(duration)]);
    }

    match params.format {
        OutputFormat::Mp4 => push_mp4_args(&mut args, params, hardware),
        OutputFormat::Webm => push_webm_args(&mut args, params),
        OutputFormat::Gif => push_gif_args(&mut args, params),
    }

    args.push(output.to_string_lossy().into_owned());

    EncodeCommand {
        program: ffmpeg.to_path_buf(),
        args,
    }
}

/// `-2` keeps the width even, which H.264 and VP9 require.
fn scale_fps_filter(params: &EncodingParameters) -> String {
    format!("scale=-2:{},fps={}", params.height, params.fps)
}

fn push_mp4_args(args: &mut Vec<String>, params: &EncodingParameters, hardware: HardwareSupport) {
    args.extend(["-vf".into(), scale_fps_filter(params)]);

    if uses_hardware_encoder(params, hardware) {
        args.extend(
            [
                "-c:v",
                HW_H264_ENCODER,
                "-b:v",
                videotoolbox_bitrate(params.quality),
            ]
            .map(String::from),
        );
    } else {
        args.extend([
            "-c:v".into(),
            SW_H264_ENCODER.into(),
            "-preset".into(),
            "veryfast".into(),
            "-crf".into(),
            x264_crf(params.quality).to_string(),
        ]);
    }

    args.extend(["-c:a", "aac", "-b:a", "64k"].map(String::from));
}

fn push_webm_args(args: &mut Vec<String>, params: &EncodingParameters) {
    args.extend(["-vf".into(), scale_fps_filter(params)]);
    args.extend(
        ["-c:v", VP9_ENCODER, "-deadline", "realtime", "-cpu-used", "8"].map(String::from),
    );
    args.extend(["-crf".into(), vp9_crf(params.quality).to_string()]);
    args.extend(["-b:v", "0", "-c:a", "libopus", "-b:a", "48k"].map(String::from));
}

fn push_gif_args(args: &mut Vec<String>, params: &EncodingParameters) {
    let graph = format!(
        "fps={fps},scale=-2:{height}:flags=lanczos,split[s0][s1];\
         [s0]palettegen=max_colors={colors}[p];[s1][p]paletteuse=dither=bayer",
        fps = params.fps,
        height = params.height,
        colors = GIF_MAX_COLORS,
    );
    args.extend(["-vf".into(), graph, "-loop".into(), "0".into()]);
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::preset::Trim;
    use proptest::prelude::*;

    fn any_params() -> impl Strategy<Value = EncodingParameters> {
        (
            1u32..2160,
            1u32..60,
            prop_oneof![
                Just(QualityTier::High),
                Just(QualityTier::Medium),
                Just(QualityTier::Low),
                Just(QualityTier::UltraLow),
            ],
            prop_oneof![
                Just(OutputFormat::Mp4),
                Just(OutputFormat::Webm),
                Just(OutputFormat::Gif),
            ],
            proptest::option::of(0.0f64..3600.0),
            any::<bool>(),
        )
            .prop_map(|(height, fps, quality, format, start, use_hardware)| EncodingParameters {
                height,
                fps,
                quality,
                format,
                trim: Trim {
                    start,
                    end: start.map(|s| s + 1.0),
                },
                use_hardware,
            })
    }

    proptest! {
        #[test]
        fn prop_build_is_deterministic(p in any_params(), hw in any::<bool>()) {
            let hardware = if hw { HardwareSupport::VideoToolbox } else { HardwareSupport::Software };
            let a = build_command(Path::new("ffmpeg"), Path::new("a.mov"), Path::new("b.out"), &p, hardware);
            let b = build_command(Path::new("ffmpeg"), Path::new("a.mov"), Path::new("b.out"), &p, hardware);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_only_mp4_uses_hardware(p in any_params()) {
            let cmd = build_command(Path::new("ffmpeg"), Path::new("a.mov"), Path::new("b.out"), &p, HardwareSupport::VideoToolbox);
            let expect_hw = p.format == OutputFormat::Mp4 && p.use_hardware;
            prop_assert_eq!(cmd.has_arg(HW_H264_ENCODER), expect_hw);
        }
    }
}

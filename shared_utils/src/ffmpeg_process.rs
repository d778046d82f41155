//! FFmpeg process plumbing
//!
//! ffmpeg writes its status line to stderr and rewrites it in place with
//! `\r`. Both pipes are drained on dedicated threads into one channel so a
//! full pipe buffer can never stall the child, and the consumer sees a
//! single combined stream of lines.
//!
//! ```ignore
//! use shared_utils::ffmpeg_process::FfmpegProcess;
//! use std::process::Command;
//!
//! let mut cmd = Command::new("ffmpeg");
//! cmd.args(["-i", "input.mp4", "output.mp4"]);
//!
//! let process = FfmpegProcess::spawn(&mut cmd)?;
//! for line in process.lines() {
//!     println!("{line}");
//! }
//! let status = process.wait()?;
//! ```

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

pub struct FfmpegProcess {
    child: Child,
    lines: Receiver<String>,
    readers: Vec<JoinHandle<()>>,
}

impl FfmpegProcess {
    /// Spawn `cmd` with stdout and stderr piped into the combined line stream.
    pub fn spawn(cmd: &mut Command) -> Result<Self> {
        info!(command = ?cmd, "Executing FFmpeg command");

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("Failed to spawn FFmpeg process")?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow::anyhow!("Failed to capture FFmpeg stderr"))?;

        let (tx, rx) = mpsc::channel();
        let readers = vec![forward_lines(stdout, tx.clone()), forward_lines(stderr, tx)];

        Ok(Self {
            child,
            lines: rx,
            readers,
        })
    }

    /// Blocking iterator over output lines; ends once both pipes hit EOF.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.lines.iter()
    }

    /// Wait for the child and join the reader threads.
    pub fn wait(mut self) -> Result<ExitStatus> {
        let status = self.child.wait().context("Failed to wait for FFmpeg")?;
        for reader in self.readers.drain(..) {
            if reader.join().is_err() {
                debug!("FFmpeg output reader panicked");
            }
        }

        if status.success() {
            info!(exit_code = status.code(), "FFmpeg process completed successfully");
        } else {
            debug!(exit_code = status.code(), "FFmpeg process failed");
        }
        Ok(status)
    }
}

fn forward_lines<R: Read + Send + 'static>(reader: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        if let Err(e) = for_each_line(reader, |line| tx.send(line).is_ok()) {
            debug!(error = %e, "FFmpeg output stream ended early");
        }
    })
}

/// Split `reader` on `\n` and `\r`, calling `f` for every non-empty line.
/// Stops early when `f` returns false.
pub fn for_each_line<R: Read>(reader: R, mut f: impl FnMut(String) -> bool) -> std::io::Result<()> {
    let mut reader = BufReader::new(reader);
    let mut pending: Vec<u8> = Vec::new();

    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        let consumed = chunk.len();
        for &byte in chunk {
            if byte == b'\n' || byte == b'\r' {
                if !pending.is_empty() {
                    let line = String::from_utf8_lossy(&pending).into_owned();
                    pending.clear();
                    if !f(line) {
                        return Ok(());
                    }
                }
            } else {
                pending.push(byte);
            }
        }
        reader.consume(consumed);
    }

    if !pending.is_empty() {
        f(String::from_utf8_lossy(&pending).into_owned());
    }
    Ok(())
}

/// True for ffmpeg status lines (`frame=... time=... speed=...`).
pub fn is_progress_line(line: &str) -> bool {
    line.contains("time=") || line.contains("frame=")
}

/// Cut `line` to at most `max_chars` characters.
pub fn truncate_line(line: &str, max_chars: usize) -> &str {
    match line.char_indices().nth(max_chars) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Fields parsed from one ffmpeg status line. Missing or `N/A` values are `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressStats {
    pub frame: Option<u64>,
    pub fps: Option<f64>,
    /// Output timestamp in seconds.
    pub time: Option<f64>,
    /// Encoding speed relative to realtime.
    pub speed: Option<f64>,
}

impl ProgressStats {
    pub fn parse(line: &str) -> Self {
        Self {
            frame: field_value(line, "frame").and_then(|v| v.parse().ok()),
            fps: field_value(line, "fps").and_then(|v| v.parse().ok()),
            time: field_value(line, "time").and_then(parse_timestamp),
            speed: field_value(line, "speed")
                .and_then(|v| v.trim_end_matches('x').parse().ok()),
        }
    }

    /// Completed fraction of `total_secs`, when a timestamp is known.
    pub fn fraction(&self, total_secs: f64) -> Option<f64> {
        match self.time {
            Some(t) if total_secs > 0.0 && t >= 0.0 => Some((t / total_secs).min(1.0)),
            _ => None,
        }
    }
}

/// Value of `key=` in an ffmpeg status line; ffmpeg pads values with spaces
/// (`frame=  123`), so leading whitespace after `=` is skipped.
fn field_value<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let needle = format!("{}=", key);
    let mut search_from = 0;
    while let Some(rel) = line[search_from..].find(&needle) {
        let start = search_from + rel;
        let at_boundary = line[..start]
            .chars()
            .next_back()
            .is_none_or(char::is_whitespace);
        let rest = &line[start + needle.len()..];
        if at_boundary {
            return rest.trim_start().split_whitespace().next();
        }
        search_from = start + needle.len();
    }
    None
}

/// Parse `HH:MM:SS.ms`; also accepts plain seconds.
pub fn parse_timestamp(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    match parts.as_slice() {
        [h, m, sec] => {
            let hours: f64 = h.parse().ok()?;
            let minutes: f64 = m.parse().ok()?;
            let seconds: f64 = sec.parse().ok()?;
            Some(hours * 3600.0 + minutes * 60.0 + seconds)
        }
        [sec] => sec.parse().ok(),
        _ => None,
    }
}

/// Pick the most meaningful line out of ffmpeg's diagnostic output.
///
/// Prefers the last line mentioning an error, then the last line that is
/// not a status line.
pub fn format_ffmpeg_error<S: AsRef<str>>(lines: &[S]) -> String {
    if let Some(error_line) = lines
        .iter()
        .map(AsRef::as_ref)
        .rev()
        .find(|line| line.contains("Error") || line.contains("error"))
    {
        return error_line.trim().to_string();
    }

    lines
        .iter()
        .map(AsRef::as_ref)
        .rev()
        .find(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !is_progress_line(trimmed) && !trimmed.starts_with("size=")
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "Unknown FFmpeg error".to_string())
}

/// Hint for common failure patterns.
pub fn get_error_suggestion(diagnostic: &str) -> Option<&'static str> {
    const PATTERNS: &[(&str, &str)] = &[
        ("No such file or directory", "check that the input path is correct"),
        ("Invalid data found", "the input file may be corrupt"),
        ("Unknown encoder", "install an ffmpeg build with the required encoder"),
        ("Permission denied", "check read/write permissions"),
        ("moov atom not found", "the MP4 input is incomplete"),
        ("Too many packets buffered", "retry with a shorter trim range"),
    ];

    PATTERNS
        .iter()
        .find(|(pattern, _)| diagnostic.contains(pattern))
        .map(|(_, suggestion)| *suggestion)
}

//! Encode supervision
//!
//! Runs a built [`EncodeCommand`], turns ffmpeg's status lines into
//! [`ProgressEvent`]s for whoever renders them, and validates the result.

use crate::command::EncodeCommand;
use crate::errors::{Result, ShrinkError};
use shared_utils::ffmpeg_process::{
    format_ffmpeg_error, get_error_suggestion, is_progress_line, truncate_line, FfmpegProcess,
    ProgressStats,
};
use shared_utils::MediaInfo;
use std::collections::VecDeque;
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Status lines are cut to this many characters.
pub const PROGRESS_LINE_WIDTH: usize = 80;

/// Non-status lines kept for the failure message.
const DIAGNOSTIC_TAIL: usize = 40;

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Started {
        command: String,
    },
    Progress {
        line: String,
        stats: ProgressStats,
    },
    Finished {
        exit_code: Option<i32>,
        elapsed: Duration,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub elapsed: Duration,
    pub output_size: u64,
}

/// Final numbers shown to the user after a successful encode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeReport {
    pub elapsed: Duration,
    pub output_size: u64,
    /// `source / output`.
    pub ratio: f64,
    pub reduction_percent: f64,
    /// Source duration divided by wall time; `2.0` means twice realtime.
    pub speed: f64,
}

impl RunOutcome {
    pub fn report(&self, source: &MediaInfo) -> EncodeReport {
        let ratio = if self.output_size > 0 {
            source.size as f64 / self.output_size as f64
        } else {
            1.0
        };
        let reduction_percent = if source.size > 0 {
            (1.0 - self.output_size as f64 / source.size as f64) * 100.0
        } else {
            0.0
        };
        let secs = self.elapsed.as_secs_f64();
        let speed = if secs > 0.0 { source.duration / secs } else { 0.0 };

        EncodeReport {
            elapsed: self.elapsed,
            output_size: self.output_size,
            ratio,
            reduction_percent,
            speed,
        }
    }
}

/// Run `command` to completion.
///
/// Succeeds only if ffmpeg exits with status 0 and `output` exists and is
/// non-empty. Partial output is left in place on failure.
pub fn run_command<F>(command: &EncodeCommand, output: &Path, mut on_event: F) -> Result<RunOutcome>
where
    F: FnMut(&ProgressEvent),
{
    let start = Instant::now();
    on_event(&ProgressEvent::Started {
        command: command.display(),
    });

    let process = FfmpegProcess::spawn(&mut command.to_command()).map_err(ShrinkError::Process)?;

    let mut tail: VecDeque<String> = VecDeque::with_capacity(DIAGNOSTIC_TAIL);
    for line in process.lines() {
        if is_progress_line(&line) {
            let stats = ProgressStats::parse(&line);
            on_event(&ProgressEvent::Progress {
                line: truncate_line(line.trim(), PROGRESS_LINE_WIDTH).to_string(),
                stats,
            });
        } else {
            debug!(line = %line, "ffmpeg");
            if tail.len() == DIAGNOSTIC_TAIL {
                tail.pop_front();
            }
            tail.push_back(line);
        }
    }

    let status = process.wait().map_err(ShrinkError::Process)?;
    let elapsed = start.elapsed();
    on_event(&ProgressEvent::Finished {
        exit_code: status.code(),
        elapsed,
    });

    if !status.success() {
        let lines: Vec<String> = tail.into_iter().collect();
        let mut detail = format_ffmpeg_error(&lines);
        if let Some(hint) = get_error_suggestion(&lines.join("\n")) {
            detail.push_str(&format!(" (hint: {})", hint));
        }
        info!(exit_code = ?status.code(), detail = %detail, "Encode failed");
        return Err(ShrinkError::EncodeFailed {
            exit_code: status.code(),
            detail,
        });
    }

    let output_size = match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => meta.len(),
        _ => {
            info!(output = %output.display(), "Encoder produced no output");
            return Err(ShrinkError::MissingOutput(output.to_path_buf()));
        }
    };

    info!(
        output = %output.display(),
        output_size,
        elapsed_secs = elapsed.as_secs_f64(),
        "Encode finished"
    );

    Ok(RunOutcome {
        elapsed,
        output_size,
    })
}

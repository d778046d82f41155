//! End-to-end runs of the `vid-shrink` binary against scripted stand-ins
//! for ffprobe and ffmpeg.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::Mutex;
use tempfile::TempDir;

// Writing an executable while another test forks can fail with ETXTBSY.
static SERIAL: Mutex<()> = Mutex::new(());

const PROBE_JSON: &str = r#"{
  "streams": [
    {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080, "r_frame_rate": "30/1"},
    {"codec_type": "audio", "codec_name": "aac"}
  ],
  "format": {"duration": "12.000000", "size": "4000000"}
}"#;

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    ffprobe: PathBuf,
    ffmpeg: PathBuf,
    marker: PathBuf,
    encoders_marker: PathBuf,
}

const SOFTWARE_ENCODERS: &str = " V....D libx264              libx264 H.264 / AVC";
const VIDEOTOOLBOX_ENCODERS: &str = " V....D libx264              libx264 H.264 / AVC
 V....D h264_videotoolbox    VideoToolbox H.264 Encoder (codec h264)";

impl Fixture {
    fn new(probe_json: &str, encoder_body: &str) -> Self {
        Self::with_encoders(probe_json, encoder_body, SOFTWARE_ENCODERS)
    }

    fn with_encoders(probe_json: &str, encoder_body: &str, encoders: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.mov");
        fs::write(&input, vec![0u8; 4096]).unwrap();

        let marker = dir.path().join("encoder-ran");
        let encoders_marker = dir.path().join("encoders-listed");
        let ffprobe = write_script(
            dir.path(),
            "ffprobe",
            &format!("#!/bin/sh\ncat <<'JSON'\n{}\nJSON\n", probe_json),
        );
        let ffmpeg = write_script(
            dir.path(),
            "ffmpeg",
            &format!(
                "#!/bin/sh\n\
                 if [ \"$2\" = \"-encoders\" ]; then\n\
                 : > '{}'\n\
                 cat <<'LIST'\n{}\nLIST\n\
                 exit 0\n\
                 fi\n\
                 for last; do :; done\n\
                 : > '{}'\n\
                 {}\n",
                encoders_marker.display(),
                encoders,
                marker.display(),
                encoder_body
            ),
        );

        Self {
            dir,
            input,
            ffprobe,
            ffmpeg,
            marker,
            encoders_marker,
        }
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out.mp4")
    }

    fn run(&self, extra: &[&str]) -> Output {
        self.run_with_tmpdir(extra, self.dir.path())
    }

    fn run_with_tmpdir(&self, extra: &[&str], tmpdir: &Path) -> Output {
        Command::new(env!("CARGO_BIN_EXE_vid-shrink"))
            .arg(&self.input)
            .arg("-o")
            .arg(self.output())
            .arg("--ffprobe")
            .arg(&self.ffprobe)
            .arg("--ffmpeg")
            .arg(&self.ffmpeg)
            .args(extra)
            .env("TMPDIR", tmpdir)
            .output()
            .unwrap()
    }
}

fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

const ENCODE_OK: &str = "\
printf 'frame=   10 fps=0.0 q=28.0 size=  1kB time=00:00:01.00 bitrate=1.0kbits/s speed=2.0x\\r' >&2
printf 'frame=   20 fps=0.0 q=28.0 size=  2kB time=00:00:02.00 bitrate=1.0kbits/s speed=2.0x\\n' >&2
printf 'encoded-video' > \"$last\"";

const ENCODE_FAIL: &str = "\
echo 'Error while opening encoder for output stream #0:0' >&2
exit 1";

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

#[test]
fn missing_input_exits_1_without_encoding() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_OK);
    fs::remove_file(&fx.input).unwrap();

    let out = fx.run(&[]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Input file not found"));
    assert!(!fx.marker.exists());
    assert!(!fx.output().exists());
}

#[test]
fn preview_prints_command_and_creates_nothing() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_OK);

    let out = fx.run(&["--preview", "--start", "10", "--end", "15"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("-c:v libx264"));
    assert!(text.contains("-crf 28"));
    assert!(text.contains("-t 5.0"));
    assert!(text.contains("1920x1080"));
    assert!(!fx.marker.exists());
    assert!(!fx.output().exists());
}

#[test]
fn full_run_reports_result() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_OK);

    let out = fx.run(&["--tiny"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    assert!(fx.marker.exists());
    assert_eq!(fs::read_to_string(fx.output()).unwrap(), "encoded-video");
    let text = stdout(&out);
    assert!(text.contains("Compression complete"));
    assert!(text.contains("scale=-2:480,fps=10"));
    assert!(text.contains("-crf 35"));
}

#[test]
fn failing_encoder_exits_1() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_FAIL);

    let out = fx.run(&["--no-hw"]);

    assert_eq!(out.status.code(), Some(1));
    assert!(fx.marker.exists());
    let err = stderr(&out);
    assert!(err.contains("exit code 1"), "stderr: {}", err);
    assert_eq!(err.matches("Error while opening encoder").count(), 1, "stderr: {}", err);
    assert!(!err.contains("FFmpeg process failed"));
}

#[test]
fn probe_without_video_stream_exits_1() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(
        r#"{"streams":[{"codec_type":"audio"}],"format":{"duration":"3.0","size":"100"}}"#,
        ENCODE_OK,
    );

    let out = fx.run(&[]);

    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("No video stream"));
    assert!(!fx.marker.exists());
}

#[test]
fn invalid_quality_level_is_rejected() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_OK);

    let out = fx.run(&["-q", "extreme"]);

    assert_ne!(out.status.code(), Some(0));
    assert!(!fx.marker.exists());
}

#[test]
fn detected_videotoolbox_is_used_for_mp4() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::with_encoders(PROBE_JSON, ENCODE_OK, VIDEOTOOLBOX_ENCODERS);

    let out = fx.run(&["--preview"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("-c:v h264_videotoolbox -b:v 1M"), "stdout: {}", text);
    assert!(!text.contains("libx264"));
    assert!(fx.encoders_marker.exists());
}

#[test]
fn no_hw_skips_detection_and_uses_libx264() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::with_encoders(PROBE_JSON, ENCODE_OK, VIDEOTOOLBOX_ENCODERS);

    let out = fx.run(&["--preview", "--no-hw"]);

    assert_eq!(out.status.code(), Some(0), "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("-c:v libx264"), "stdout: {}", text);
    assert!(!text.contains("h264_videotoolbox"));
    assert!(!fx.encoders_marker.exists());
}

#[cfg(target_os = "linux")]
#[test]
fn unwritable_log_dir_still_exits_1() {
    let _guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
    let fx = Fixture::new(PROBE_JSON, ENCODE_OK);
    fs::remove_file(&fx.input).unwrap();

    let out = fx.run_with_tmpdir(&[], Path::new("/proc"));

    assert_eq!(out.status.code(), Some(1), "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("Could not initialise logging"));
    assert!(err.contains("Input file not found"));
}

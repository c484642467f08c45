use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};

use crate::encode::pixel::FrameBgr24;
use crate::encode::sink::{FrameSink, SinkConfig, VideoCodec};
use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{PosevidError, PosevidResult};

/// Options for [`FfmpegSink`] output.
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Final output path. The container is chosen from its extension.
    pub out_path: PathBuf,
}

impl FfmpegSinkOpts {
    /// Create options for writing a video to `out_path`.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
        }
    }
}

/// Sink that spawns the system `ffmpeg` and streams raw BGR24 frames to its stdin.
///
/// `ffmpeg` writes to `<out>.partial`; the file is renamed onto the output path only after
/// `ffmpeg` exits cleanly in [`FrameSink::end`]. Aborting (or dropping an unfinished sink) kills
/// `ffmpeg` and removes the partial file.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,

    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<std::thread::JoinHandle<std::io::Result<Vec<u8>>>>,

    cfg: Option<SinkConfig>,
    partial_path: Option<PathBuf>,
    frames: u64,
}

impl FfmpegSink {
    /// Create a new sink that streams into `ffmpeg`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            cfg: None,
            partial_path: None,
            frames: 0,
        }
    }

    /// Frames written since `begin`.
    pub fn frames_written(&self) -> u64 {
        self.frames
    }

    fn join_stderr(&mut self) -> PosevidResult<Vec<u8>> {
        match self.stderr_drain.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| PosevidError::encoding("ffmpeg stderr drain thread panicked"))?
                .map_err(|e| PosevidError::encoding(format!("ffmpeg stderr read failed: {e}"))),
            None => Ok(Vec::new()),
        }
    }

    fn remove_partial(&mut self) {
        if let Some(partial) = self.partial_path.take()
            && let Err(e) = std::fs::remove_file(&partial)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %partial.display(), error = %e, "failed to remove partial output");
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> PosevidResult<()> {
        if self.child.is_some() {
            return Err(PosevidError::encoding("ffmpeg sink already started"));
        }
        cfg.validate()?;
        if !cfg.width.is_multiple_of(2) || !cfg.height.is_multiple_of(2) {
            return Err(PosevidError::encoding(
                "ffmpeg sink width/height must be even (required for yuv420p output)",
            ));
        }

        let muxer = container_format(&self.opts.out_path)?;
        ensure_parent_dir(&self.opts.out_path)?;

        if !is_ffmpeg_on_path() {
            return Err(PosevidError::encoding(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }
        let encoder = cfg.codec.ffmpeg_encoder();
        if !is_encoder_available(encoder) {
            return Err(PosevidError::encoding(format!(
                "ffmpeg on PATH does not provide the '{encoder}' encoder"
            )));
        }

        let partial = partial_path(&self.opts.out_path);
        let mut cmd = Command::new("ffmpeg");
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Input: packed bgr24, exactly what the pipeline hands us.
        cmd.args([
            "-y",
            "-loglevel",
            "error",
            "-f",
            "rawvideo",
            "-pix_fmt",
            "bgr24",
            "-s",
            &format!("{}x{}", cfg.width, cfg.height),
        ]);
        push_input_fps(&mut cmd, cfg.fps);
        cmd.args(["-i", "pipe:0"]);
        push_output_args(&mut cmd, &cfg, muxer, &partial);

        let mut child = cmd.spawn().map_err(|e| {
            PosevidError::encoding(format!(
                "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| PosevidError::encoding("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| PosevidError::encoding("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        tracing::debug!(
            out = %self.opts.out_path.display(),
            encoder,
            muxer,
            width = cfg.width,
            height = cfg.height,
            "ffmpeg started"
        );

        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.partial_path = Some(partial);
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, _idx: FrameIndex, frame: &FrameBgr24) -> PosevidResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| PosevidError::encoding("ffmpeg sink not started"))?;
        cfg.check_frame(frame)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(PosevidError::encoding("ffmpeg sink is already finalized"));
        };

        use std::io::Write as _;
        stdin.write_all(&frame.data).map_err(|e| {
            PosevidError::encoding(format!("failed to write frame to ffmpeg stdin: {e}"))
        })?;
        self.frames += 1;
        Ok(())
    }

    fn end(&mut self) -> PosevidResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| PosevidError::encoding("ffmpeg sink not started"))?;

        let status = child.wait().map_err(|e| {
            PosevidError::encoding(format!("failed to wait for ffmpeg to finish: {e}"))
        });
        let stderr_bytes = self.join_stderr();
        let cfg = self.cfg.take();

        let status = match status {
            Ok(status) => status,
            Err(e) => {
                self.remove_partial();
                return Err(e);
            }
        };

        let partial = self
            .partial_path
            .clone()
            .ok_or_else(|| PosevidError::encoding("ffmpeg sink lost its partial output path"))?;

        if !status.success() || !is_nonempty_file(&partial) {
            let stderr = String::from_utf8_lossy(stderr_bytes.as_deref().unwrap_or_default());
            // Some ffmpeg builds refuse a rawvideo input that never delivered a frame.
            let retried = match cfg {
                Some(cfg) if self.frames == 0 => {
                    tracing::debug!(
                        status = %status,
                        stderr = %stderr.trim(),
                        "ffmpeg produced no output for zero frames, writing an empty video"
                    );
                    encode_empty_video(&cfg, &self.opts.out_path, &partial)
                }
                _ => Err(PosevidError::encoding(format!(
                    "ffmpeg exited with status {}: {}",
                    status,
                    stderr.trim()
                ))),
            };
            if let Err(e) = retried {
                self.remove_partial();
                return Err(e);
            }
        }
        self.partial_path = None;
        std::fs::rename(&partial, &self.opts.out_path).map_err(|e| {
            PosevidError::encoding(format!(
                "failed to move '{}' to '{}': {e}",
                partial.display(),
                self.opts.out_path.display()
            ))
        })?;
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            // Already-exited children make kill() fail; wait() below still reaps them.
            let _ = child.kill();
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "failed to reap ffmpeg after abort");
            }
        }
        if let Err(e) = self.join_stderr() {
            tracing::warn!(error = %e, "failed to collect ffmpeg stderr after abort");
        }
        self.cfg = None;
        self.remove_partial();
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn push_input_fps(cmd: &mut Command, fps: Fps) {
    // Rawvideo input frame rate. Accept rational FPS as `num/den`.
    cmd.args(["-framerate", &format!("{}/{}", fps.num, fps.den)]);
}

fn push_output_args(cmd: &mut Command, cfg: &SinkConfig, muxer: &str, partial: &Path) {
    cmd.args(["-an", "-c:v", cfg.codec.ffmpeg_encoder()]);
    if cfg.codec == VideoCodec::Mpeg4 {
        cmd.args(["-q:v", "3"]);
    }
    cmd.args(["-pix_fmt", "yuv420p", "-f", muxer]);
    if muxer == "mp4" || muxer == "mov" {
        cmd.args(["-movflags", "+faststart"]);
    }
    cmd.arg(partial);
}

/// Write a zero-frame video with the configured stream parameters to `partial`.
///
/// Uses a generated black source capped at zero output frames, so the container still carries a
/// video stream of the right size, rate and codec.
fn encode_empty_video(cfg: &SinkConfig, out_path: &Path, partial: &Path) -> PosevidResult<()> {
    let muxer = container_format(out_path)?;
    let mut cmd = Command::new("ffmpeg");
    cmd.stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped());
    cmd.args([
        "-y",
        "-loglevel",
        "error",
        "-f",
        "lavfi",
        "-i",
        &format!(
            "color=c=black:s={}x{}:r={}/{}",
            cfg.width, cfg.height, cfg.fps.num, cfg.fps.den
        ),
        "-frames:v",
        "0",
    ]);
    push_output_args(&mut cmd, cfg, muxer, partial);

    let out = cmd.output().map_err(|e| {
        PosevidError::encoding(format!("failed to spawn ffmpeg for empty video: {e}"))
    })?;
    if !out.status.success() || !is_nonempty_file(partial) {
        return Err(PosevidError::encoding(format!(
            "ffmpeg could not write an empty video (status {}): {}",
            out.status,
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }
    Ok(())
}

fn is_nonempty_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.len() > 0)
}

/// `ffmpeg` muxer for an output path, chosen from its extension.
pub fn container_format(path: &Path) -> PosevidResult<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or_else(|| {
            PosevidError::encoding(format!(
                "output path '{}' has no container extension",
                path.display()
            ))
        })?;
    match ext.as_str() {
        "mp4" | "m4v" => Ok("mp4"),
        "mov" => Ok("mov"),
        "mkv" => Ok("matroska"),
        "avi" => Ok("avi"),
        other => Err(PosevidError::encoding(format!(
            "unsupported output container '.{other}' (expected mp4, m4v, mov, mkv or avi)"
        ))),
    }
}

/// Sibling path `ffmpeg` writes to before the output is finalized.
pub fn partial_path(out_path: &Path) -> PathBuf {
    let mut name = out_path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> PosevidResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    std::process::Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Return `true` when `ffmpeg -encoders` lists `name`.
pub fn is_encoder_available(name: &str) -> bool {
    let Ok(out) = std::process::Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .stderr(std::process::Stdio::null())
        .output()
    else {
        return false;
    };
    encoders_list_contains(&String::from_utf8_lossy(&out.stdout), name)
}

fn encoders_list_contains(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}

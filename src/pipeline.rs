//! Record source → frame filter → marker renderer → encoder.

use std::fs::File;
use std::path::{Path, PathBuf};

use crate::config::AnimationConfig;
use crate::encode::pixel::{flatten_premul_over_bg_to_opaque_rgba8, frame_to_bgr24};
use crate::encode::sink::{FrameSink, SinkConfig};
use crate::foundation::error::{PosevidError, PosevidResult};
use crate::records::{FrameFilter, FrameRecord, RecordReader};
use crate::render::cpu::MarkerRenderer;
use crate::render::frame::RenderedFrame;

/// Options that do not affect the rendered pixels.
#[derive(Clone, Debug, Default)]
pub struct AnimationSessionOpts {
    /// Also save every rendered frame as `<frame:05>.png` in this directory.
    pub frames_dir: Option<PathBuf>,
}

/// Counters reported after a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Input rows read, including filtered ones.
    pub rows_read: u64,
    /// Rows dropped for being before the start frame.
    pub rows_skipped: u64,
    pub frames_written: u64,
    pub markers_drawn: u64,
}

/// One conversion run: owns the configuration and the renderer built from it.
pub struct AnimationSession {
    cfg: AnimationConfig,
    filter: FrameFilter,
    renderer: MarkerRenderer,
    opts: AnimationSessionOpts,
}

impl AnimationSession {
    /// Validate `cfg`, load the label font if needed, and prepare the renderer.
    pub fn new(cfg: AnimationConfig, opts: AnimationSessionOpts) -> PosevidResult<Self> {
        let renderer = MarkerRenderer::new(&cfg)?;
        Ok(Self {
            filter: FrameFilter::new(cfg.start_frame),
            cfg,
            renderer,
            opts,
        })
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.cfg
    }

    /// Parameters the output stream is opened with.
    pub fn sink_config(&self) -> SinkConfig {
        SinkConfig {
            width: self.cfg.canvas.width,
            height: self.cfg.canvas.height,
            fps: self.cfg.fps,
            codec: self.cfg.codec,
        }
    }

    /// Open `path` as a record source for this session's keypoints.
    pub fn open_records(&self, path: &Path) -> PosevidResult<RecordReader<File>> {
        RecordReader::open(path, &self.cfg.keypoints)
    }

    /// Read `input` and encode every record at or after the start frame into `sink`.
    ///
    /// The input is opened before the sink, so an unreadable input never touches the output.
    pub fn render_csv(
        &mut self,
        input: &Path,
        sink: &mut dyn FrameSink,
    ) -> PosevidResult<RenderStats> {
        let records = self.open_records(input)?;
        self.render_records(records, sink)
    }

    /// Encode `records` into `sink` in iteration order.
    ///
    /// The sink is released exactly once: `end` when every record went through, `abort` on the
    /// first error.
    #[tracing::instrument(skip_all, fields(start_frame = self.cfg.start_frame.0))]
    pub fn render_records<I>(
        &mut self,
        records: I,
        sink: &mut dyn FrameSink,
    ) -> PosevidResult<RenderStats>
    where
        I: IntoIterator<Item = PosevidResult<FrameRecord>>,
    {
        if let Some(dir) = self.opts.frames_dir.as_ref() {
            std::fs::create_dir_all(dir).map_err(|e| {
                PosevidError::encoding(format!(
                    "failed to create frames directory '{}': {e}",
                    dir.display()
                ))
            })?;
        }

        if let Err(e) = sink.begin(self.sink_config()) {
            sink.abort();
            return Err(e);
        }

        let mut stats = RenderStats::default();
        match self.stream(records, sink, &mut stats) {
            Ok(()) => {
                sink.end()?;
                tracing::info!(
                    rows = stats.rows_read,
                    skipped = stats.rows_skipped,
                    frames = stats.frames_written,
                    markers = stats.markers_drawn,
                    "animation finished"
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    frames = stats.frames_written,
                    "aborting output"
                );
                sink.abort();
                Err(e)
            }
        }
    }

    fn stream<I>(
        &mut self,
        records: I,
        sink: &mut dyn FrameSink,
        stats: &mut RenderStats,
    ) -> PosevidResult<()>
    where
        I: IntoIterator<Item = PosevidResult<FrameRecord>>,
    {
        let bg = self.cfg.background.to_array();
        for record in records {
            let record = record?;
            stats.rows_read += 1;
            if !self.filter.accepts(&record) {
                stats.rows_skipped += 1;
                continue;
            }

            let rendered = self.renderer.render(&record)?;
            tracing::info!(frame = record.frame.0, "writing frame to video");

            if let Some(dir) = self.opts.frames_dir.as_deref() {
                write_frame_png(dir, &rendered, bg)?;
            }

            let bgr = frame_to_bgr24(&rendered.pixels, bg)?;
            sink.push_frame(rendered.index, &bgr)?;

            stats.frames_written += 1;
            stats.markers_drawn += rendered.markers as u64;
        }
        Ok(())
    }
}

/// File name used for a frame's PNG dump.
pub fn frame_png_name(frame: &RenderedFrame) -> String {
    format!("{:05}.png", frame.index.0)
}

fn write_frame_png(dir: &Path, frame: &RenderedFrame, bg: [u8; 4]) -> PosevidResult<()> {
    let px = &frame.pixels;
    let mut rgba = vec![0u8; px.data.len()];
    if px.premultiplied {
        flatten_premul_over_bg_to_opaque_rgba8(&mut rgba, &px.data, bg)?;
    } else {
        rgba.copy_from_slice(&px.data);
    }

    let path = dir.join(frame_png_name(frame));
    image::save_buffer_with_format(
        &path,
        &rgba,
        px.width,
        px.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .map_err(|e| PosevidError::encoding(format!("write png '{}': {e}", path.display())))
}

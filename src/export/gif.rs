use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use gif::{DisposalMethod, Encoder, Repeat};

use crate::export::sink::{AnimatedImageSink, LoopPolicy, SinkConfig};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::raster::bitmap::Bitmap;

/// Palette quantization speed handed to the encoder (1 = best, 30 = fastest).
const QUANTIZE_SPEED: i32 = 10;

/// Streams frames into a GIF file.
///
/// Frames go to `<out>.partial`; the file only appears under its final name after `finish`.
pub struct GifSink {
    out_path: PathBuf,
    partial_path: PathBuf,
    encoder: Option<Encoder<BufWriter<File>>>,
    cfg: Option<SinkConfig>,
    delay: u16,
    next_idx: usize,
}

impl std::fmt::Debug for GifSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GifSink")
            .field("out_path", &self.out_path)
            .field("started", &self.encoder.is_some())
            .field("next_idx", &self.next_idx)
            .finish()
    }
}

impl GifSink {
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        let out_path = out_path.into();
        let mut partial = out_path.clone().into_os_string();
        partial.push(".partial");
        Self {
            out_path,
            partial_path: PathBuf::from(partial),
            encoder: None,
            cfg: None,
            delay: 0,
            next_idx: 0,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.out_path
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial_path
    }

    fn remove_partial(&self) {
        match std::fs::remove_file(&self.partial_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                path = %self.partial_path.display(),
                error = %err,
                "partial gif removal failed"
            ),
        }
    }
}

impl AnimatedImageSink for GifSink {
    fn begin(&mut self, cfg: SinkConfig) -> FlipbookResult<()> {
        let (width, height) = cfg.canvas.dims_u16()?;
        if let Some(parent) = self.out_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create output dir '{}'", parent.display()))?;
        }
        let file = File::create(&self.partial_path)
            .with_context(|| format!("create '{}'", self.partial_path.display()))?;

        let mut encoder = Encoder::new(BufWriter::new(file), width, height, &[])
            .map_err(|e| FlipbookError::encode(format!("failed to create gif encoder: {e}")))?;
        let repeat = match cfg.loop_policy {
            LoopPolicy::Forever => Repeat::Infinite,
            LoopPolicy::Finite(n) => Repeat::Finite(n),
        };
        encoder
            .set_repeat(repeat)
            .map_err(|e| FlipbookError::encode(format!("failed to set gif repeat: {e}")))?;

        self.delay = cfg.fps.frame_delay_centis();
        self.encoder = Some(encoder);
        self.cfg = Some(cfg);
        self.next_idx = 0;
        Ok(())
    }

    fn push_frame(&mut self, idx: usize, frame: &Bitmap) -> FlipbookResult<()> {
        let cfg = self
            .cfg
            .ok_or_else(|| FlipbookError::encode("gif sink not started"))?;
        if idx != self.next_idx {
            return Err(FlipbookError::encode(format!(
                "gif frames out of order: expected {}, got {idx}",
                self.next_idx
            )));
        }
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| FlipbookError::encode("gif sink not started"))?;

        let (width, height) = cfg.canvas.dims_u16()?;
        let mut rgba = if frame.canvas() == cfg.canvas {
            frame.to_straight_rgba8()
        } else {
            resize_straight(frame, cfg.canvas.width, cfg.canvas.height)?
        };
        let mut gif_frame = gif::Frame::from_rgba_speed(width, height, &mut rgba, QUANTIZE_SPEED);
        gif_frame.delay = self.delay;
        gif_frame.dispose = DisposalMethod::Background;
        encoder
            .write_frame(&gif_frame)
            .map_err(|e| FlipbookError::encode(format!("failed to write gif frame {idx}: {e}")))?;
        self.next_idx += 1;
        Ok(())
    }

    fn finish(&mut self) -> FlipbookResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| FlipbookError::encode("gif sink not started"))?;
        let finalized = encoder
            .into_inner()
            .map_err(|e| FlipbookError::encode(format!("failed to finalize gif: {e}")))
            .and_then(|mut writer| {
                writer
                    .flush()
                    .with_context(|| format!("flush '{}'", self.partial_path.display()))?;
                Ok(())
            })
            .and_then(|()| {
                std::fs::rename(&self.partial_path, &self.out_path).with_context(|| {
                    format!(
                        "rename '{}' to '{}'",
                        self.partial_path.display(),
                        self.out_path.display()
                    )
                })?;
                Ok(())
            });
        if finalized.is_err() {
            self.remove_partial();
        }
        finalized
    }

    fn abort(&mut self) {
        drop(self.encoder.take());
        self.remove_partial();
    }
}

impl Drop for GifSink {
    fn drop(&mut self) {
        if self.encoder.is_some() {
            self.abort();
        }
    }
}

fn resize_straight(frame: &Bitmap, width: u32, height: u32) -> FlipbookResult<Vec<u8>> {
    let img = image::RgbaImage::from_raw(frame.width(), frame.height(), frame.to_straight_rgba8())
        .ok_or_else(|| FlipbookError::encode("frame buffer does not match its dimensions"))?;
    let resized =
        image::imageops::resize(&img, width, height, image::imageops::FilterType::Triangle);
    Ok(resized.into_raw())
}

#[cfg(test)]
#[path = "../../tests/unit/export/gif.rs"]
mod tests;

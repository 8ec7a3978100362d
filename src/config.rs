use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::draw::surface::SurfaceOpts;
use crate::draw::tool::ToolConfig;
use crate::export::exporter::ExportOpts;
use crate::foundation::core::{Canvas, Fps};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::frame::store::FrameStoreOpts;
use crate::generate::batch::GeneratorOpts;

/// Every tunable of the engine in one JSON-friendly value.
///
/// Missing fields fall back to their defaults, so `{}` is a valid configuration.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub canvas: Canvas,
    pub fps: Fps,
    pub tool: ToolConfig,
    pub surface: SurfaceOpts,
    pub frames: FrameStoreOpts,
    pub generator: GeneratorOpts,
    pub export: ExportOpts,
}

impl EngineConfig {
    pub fn from_reader<R: std::io::Read>(r: R) -> FlipbookResult<Self> {
        let cfg: Self = serde_json::from_reader(r)
            .map_err(|e| FlipbookError::validation(format!("parse config JSON: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: impl AsRef<Path>) -> FlipbookResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| {
            FlipbookError::validation(format!("open config JSON '{}': {e}", path.display()))
        })?;
        Self::from_reader(BufReader::new(f))
    }

    pub fn validate(&self) -> FlipbookResult<()> {
        self.canvas.validate()?;
        if self.fps.num == 0 || self.fps.den == 0 {
            return Err(FlipbookError::validation("fps must be non-zero"));
        }
        if self.surface.history_capacity == 0 {
            return Err(FlipbookError::validation("history_capacity must be >= 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;

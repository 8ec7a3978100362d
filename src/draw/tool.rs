use crate::foundation::core::Rgba8;
use crate::foundation::error::FlipbookError;
use crate::geometry::shape::GeometryShape;

pub const MIN_LINE_WIDTH: f64 = 4.0;
pub const MAX_LINE_WIDTH: f64 = 104.0;

/// Drawing tools. Dispatch is always an exhaustive `match`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Pen,
    Brush,
    Eraser,
    Geometry(GeometryShape),
}

impl Tool {
    pub fn id(self) -> &'static str {
        match self {
            Tool::Pen => "pen",
            Tool::Brush => "brush",
            Tool::Eraser => "eraser",
            Tool::Geometry(shape) => shape.id(),
        }
    }
}

impl std::str::FromStr for Tool {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pen" => Ok(Tool::Pen),
            "brush" => Ok(Tool::Brush),
            "eraser" => Ok(Tool::Eraser),
            other => other
                .parse::<GeometryShape>()
                .map(Tool::Geometry)
                .map_err(|_| FlipbookError::validation(format!("unknown tool '{other}'"))),
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Tool selection plus stroke style, snapshotted by the surface at the start of every stroke.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    pub tool: Option<Tool>,
    line_width: f64,
    pub color: Rgba8,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tool: Some(Tool::Pen),
            line_width: MIN_LINE_WIDTH,
            color: Rgba8::BLACK,
        }
    }
}

impl ToolConfig {
    pub fn new(tool: Option<Tool>, line_width: f64, color: Rgba8) -> Self {
        Self {
            tool,
            line_width: clamp_width(line_width),
            color,
        }
    }

    /// Map a `[0, 1]` slider position onto the line width range.
    pub fn width_from_slider(value: f64) -> f64 {
        clamp_width(MIN_LINE_WIDTH + 100.0 * value)
    }

    pub fn line_width(&self) -> f64 {
        clamp_width(self.line_width)
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.line_width = clamp_width(width);
    }

    pub fn with_tool(mut self, tool: Option<Tool>) -> Self {
        self.tool = tool;
        self
    }

    pub fn with_line_width(mut self, width: f64) -> Self {
        self.set_line_width(width);
        self
    }

    pub fn with_color(mut self, color: Rgba8) -> Self {
        self.color = color;
        self
    }

    pub fn is_eraser(&self) -> bool {
        matches!(self.tool, Some(Tool::Eraser))
    }

    pub fn is_geometry(&self) -> bool {
        matches!(self.tool, Some(Tool::Geometry(_)))
    }

    pub fn can_draw(&self) -> bool {
        self.tool.is_some()
    }
}

fn clamp_width(w: f64) -> f64 {
    if w.is_finite() {
        w.clamp(MIN_LINE_WIDTH, MAX_LINE_WIDTH)
    } else {
        MIN_LINE_WIDTH
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/tool.rs"]
mod tests;

use kurbo::{Cap, Join, Stroke, StrokeOpts};

use crate::draw::tool::Tool;
use crate::foundation::core::{BezPath, Canvas, Point, Rgba8};
use crate::foundation::error::{FlipbookError, FlipbookResult};
use crate::geometry::shape::dot_path;
use crate::raster::bitmap::Bitmap;
use crate::raster::blur::{gaussian_blur_premul, sigma_for_radius};
use crate::raster::composite::{dest_out_in_place, over_in_place};

const TOLERANCE: f64 = 0.1;
const GLOW_ALPHA: f64 = 0.35;
const GLOW_WIDTH_SCALE: f64 = 1.6;
const MAX_GLOW_RADIUS: u32 = 24;
const BRISTLE_OFFSETS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -0.5), (-0.5, 1.0), (0.75, 0.75)];

/// What a stroke covers: a stroked path, or a filled dot for single-point strokes.
#[derive(Clone, Debug, PartialEq)]
pub enum StrokeShape {
    Path(BezPath),
    Dot { center: Point, radius: f64 },
}

impl StrokeShape {
    /// Fill outline at `scale` times the nominal width, shifted by `offset`.
    fn outline(&self, width: f64, scale: f64, offset: (f64, f64)) -> BezPath {
        let shift = kurbo::Affine::translate(offset);
        match self {
            StrokeShape::Path(path) => {
                let style = Stroke::new(width * scale)
                    .with_caps(Cap::Round)
                    .with_join(Join::Round);
                shift * kurbo::stroke(path.iter(), &style, &StrokeOpts::default(), TOLERANCE)
            }
            StrokeShape::Dot { center, radius } => shift * dot_path(*center, radius * scale),
        }
    }
}

/// One committed stroke, fully resolved against the tool configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeOp {
    pub shape: StrokeShape,
    pub tool: Tool,
    pub width: f64,
    pub color: Rgba8,
}

/// Render `op` on top of `base` (or a transparent canvas) and return the result.
///
/// `base` is never modified.
#[tracing::instrument(level = "debug", skip_all, fields(tool = op.tool.id()))]
pub fn rasterize_onto(
    canvas: Canvas,
    base: Option<&Bitmap>,
    op: &StrokeOp,
) -> FlipbookResult<Bitmap> {
    let mut dst = match base {
        Some(b) if b.canvas() != canvas => {
            return Err(FlipbookError::render(format!(
                "base bitmap is {}x{}, canvas is {}x{}",
                b.width(),
                b.height(),
                canvas.width,
                canvas.height
            )));
        }
        Some(b) => b.data().to_vec(),
        None => vec![0u8; canvas.byte_len()],
    };

    match op.tool {
        Tool::Pen | Tool::Geometry(_) => {
            let outline = op.shape.outline(op.width, 1.0, (0.0, 0.0));
            let layer = fill_layer(canvas, &[(outline, op.color)])?;
            over_in_place(&mut dst, &layer, 1.0)?;
        }
        Tool::Brush => {
            let glow = fill_layer(
                canvas,
                &[(
                    op.shape.outline(op.width, GLOW_WIDTH_SCALE, (0.0, 0.0)),
                    op.color.fade(GLOW_ALPHA),
                )],
            )?;
            let radius = ((op.width / 2.0).round() as u32).clamp(1, MAX_GLOW_RADIUS);
            let glow = gaussian_blur_premul(
                &glow,
                canvas.width,
                canvas.height,
                radius,
                sigma_for_radius(radius),
            )?;
            over_in_place(&mut dst, &glow, 1.0)?;

            let jitter = op.width / 8.0;
            let bristles: Vec<_> = BRISTLE_OFFSETS
                .iter()
                .map(|&(dx, dy)| {
                    (
                        op.shape.outline(op.width, 0.5, (dx * jitter, dy * jitter)),
                        op.color,
                    )
                })
                .collect();
            let layer = fill_layer(canvas, &bristles)?;
            over_in_place(&mut dst, &layer, 1.0)?;
        }
        Tool::Eraser => {
            let mask = fill_layer(
                canvas,
                &[(op.shape.outline(op.width, 1.0, (0.0, 0.0)), Rgba8::WHITE)],
            )?;
            dest_out_in_place(&mut dst, &mask)?;
        }
    }

    Bitmap::from_premul_rgba8(canvas.width, canvas.height, dst)
}

/// Rasterize filled outlines into a fresh transparent premultiplied buffer.
fn fill_layer(canvas: Canvas, fills: &[(BezPath, Rgba8)]) -> FlipbookResult<Vec<u8>> {
    let (w, h) = canvas.dims_u16()?;
    let mut ctx = vello_cpu::RenderContext::new(w, h);
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    for (path, color) in fills {
        ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
            color.r, color.g, color.b, color.a,
        ));
        ctx.fill_path(&bezpath_to_cpu(path));
    }
    ctx.flush();

    let mut pixmap = vello_cpu::Pixmap::new(w, h);
    ctx.render_to_pixmap(&mut pixmap);
    let data = pixmap.data_as_u8_slice();
    if data.len() != canvas.byte_len() {
        return Err(FlipbookError::render("pixmap size does not match canvas"));
    }
    Ok(data.to_vec())
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/raster/cpu.rs"]
mod tests;

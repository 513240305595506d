use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Pixmap, Rect, Stroke, Transform};

use super::palette::{Palette, Rgb, Rgba};
use super::wave::{WavePath, WavePoint};
use super::{RenderConfig, Style, TIP_THICKNESS};
use crate::viz::topology::{segment_stride, TopologyMapper};
use crate::viz::{BarDrawState, BarPosition, Frame, Growth, Placement, VisualizerConfig, Viewport};

const IDLE_THICKNESS: f32 = 2.0;

fn paint(color: Rgba, anti_alias: bool) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = anti_alias;
    paint
}

/// Software RGBA target for the 2D bar and wave renderers. A zero-sized
/// canvas has no pixmap and ignores every draw call.
pub struct Canvas {
    width: u32,
    height: u32,
    pixmap: Option<Pixmap>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixmap: Pixmap::new(width, height),
        }
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.width as f32, self.height as f32)
    }

    /// Row-major RGBA bytes, premultiplied by alpha. Opaque once cleared.
    pub fn pixels(&self) -> &[u8] {
        self.pixmap.as_ref().map_or(&[], |pixmap| pixmap.data())
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let color = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([color.red(), color.green(), color.blue(), color.alpha()])
    }

    pub fn clear(&mut self, [r, g, b]: Rgb) {
        if let Some(pixmap) = self.pixmap.as_mut() {
            pixmap.fill(Color::from_rgba8(r, g, b, 255));
        }
    }

    /// Fill the axis-aligned rectangle spanning the two corners.
    pub fn fill_rect(&mut self, x0: f32, y0: f32, x1: f32, y1: f32, color: Rgba) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let Some(rect) = Rect::from_ltrb(x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)) else {
            return;
        };
        pixmap.fill_rect(rect, &paint(color, false), Transform::identity(), None);
    }

    /// Fill a convex quad given in order around its perimeter.
    pub fn fill_quad(&mut self, corners: [(f32, f32); 4], color: Rgba) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let mut builder = PathBuilder::new();
        builder.move_to(corners[0].0, corners[0].1);
        for &(x, y) in &corners[1..] {
            builder.line_to(x, y);
        }
        builder.close();
        if let Some(path) = builder.finish() {
            pixmap.fill_path(&path, &paint(color, true), FillRule::Winding, Transform::identity(), None);
        }
    }

    pub fn stroke_polyline(&mut self, points: &[WavePoint], thickness: f32, closed: bool, color: Rgba) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        let mut builder = PathBuilder::new();
        builder.move_to(first.x, first.y);
        for point in rest {
            builder.line_to(point.x, point.y);
        }
        if closed {
            builder.close();
        }
        let Some(path) = builder.finish() else {
            return;
        };
        let stroke = Stroke {
            width: thickness.max(1.0),
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint(color, true), &stroke, Transform::identity(), None);
    }

    fn stroke_ring(&mut self, cx: f32, cy: f32, radius: f32, thickness: f32, color: Rgba) {
        let (Some(pixmap), Some(path)) = (self.pixmap.as_mut(), PathBuilder::from_circle(cx, cy, radius)) else {
            return;
        };
        let stroke = Stroke { width: thickness, ..Stroke::default() };
        pixmap.stroke_path(&path, &paint(color, true), &stroke, Transform::identity(), None);
    }

    /// Fill the part of a bar between `start` and `end`, measured outward from
    /// its anchor. Symmetric bars are filled on both sides.
    fn fill_span(&mut self, bar: &BarDrawState, start: f32, end: f32, color: Rgba) {
        let half = bar.width * 0.5;
        match bar.placement {
            Placement::Linear { x, y, growth } => {
                let (x0, x1) = (x - half, x + half);
                match growth {
                    Growth::Up => self.fill_rect(x0, y - end, x1, y - start, color),
                    Growth::Down => self.fill_rect(x0, y + start, x1, y + end, color),
                    Growth::Both => {
                        self.fill_rect(x0, y - end, x1, y - start, color);
                        self.fill_rect(x0, y + start, x1, y + end, color);
                    }
                }
            }
            Placement::Radial { cx, cy, angle, radius } => {
                let (dx, dy) = (angle.cos(), angle.sin());
                let (nx, ny) = (-dy * half, dx * half);
                let (r0, r1) = (radius + start, radius + end);
                let (ax, ay) = (cx + dx * r0, cy + dy * r0);
                let (bx, by) = (cx + dx * r1, cy + dy * r1);
                self.fill_quad(
                    [(ax + nx, ay + ny), (bx + nx, by + ny), (bx - nx, by - ny), (ax - nx, ay - ny)],
                    color,
                );
            }
        }
    }

    pub fn draw_bars(&mut self, bars: &[BarDrawState], palette: &Palette, config: &VisualizerConfig) {
        let stride = segment_stride(config.segment_height, config.segment_gap);
        for bar in bars {
            let color = palette.bar(bar.index);
            match bar.segments {
                Some(blocks) => {
                    for block in 0..blocks {
                        let start = block as f32 * stride;
                        self.fill_span(bar, start, start + config.segment_height, color);
                    }
                }
                None if bar.height > 0.0 => self.fill_span(bar, 0.0, bar.reach(), color),
                None => {}
            }
            if let Some(tip) = bar.tip_reach() {
                self.fill_span(bar, tip, tip + TIP_THICKNESS, palette.tip(bar.index));
            }
        }
    }

    /// Flat indicator drawn while the visualizer is idle.
    pub fn draw_idle(&mut self, config: &VisualizerConfig, color: Rgba) {
        let viewport = self.viewport();
        let (width, height) = (viewport.width, viewport.height);
        match config.position {
            BarPosition::Bottom => self.fill_rect(0.0, height - IDLE_THICKNESS, width, height, color),
            BarPosition::Top => self.fill_rect(0.0, 0.0, width, IDLE_THICKNESS, color),
            BarPosition::Center => {
                let mid = height * 0.5;
                self.fill_rect(0.0, mid - IDLE_THICKNESS * 0.5, width, mid + IDLE_THICKNESS * 0.5, color);
            }
            BarPosition::Circle => {
                let radius = TopologyMapper::new(config, viewport).inner_radius();
                let (cx, cy) = viewport.center();
                self.stroke_ring(cx, cy, radius, IDLE_THICKNESS, color);
            }
        }
    }

    pub fn draw_wave(&mut self, path: &WavePath, thickness: f32, color: Rgba) {
        self.stroke_polyline(&path.points, thickness, path.closed, color);
    }

    /// Draw one processed tick with the given style.
    pub fn render_frame(&mut self, frame: &Frame, config: &VisualizerConfig, render: &RenderConfig, time: f32) {
        self.clear(render.background);
        let palette = render.color.resolve(config.bar_count, time);
        match frame {
            Frame::Idle => self.draw_idle(config, palette.bar(0)),
            Frame::Bars(bars) => match render.style {
                Style::Bars => self.draw_bars(bars, &palette, config),
                Style::Wave => {
                    let path = render.wave.trace(bars, self.viewport(), time);
                    self.draw_wave(&path, render.wave.thickness, palette.bar(config.bar_count / 2));
                }
            },
        }
    }
}

//! Animation loop, visual mappings and the canvas they draw on.
//!
//! The loop is the only place geometry is derived from parameters. It reads
//! the store through a [`RenderContext`] and writes nothing but the motion
//! accumulator, and only while playing.

mod circles;
mod draw_list;
mod lissajous;

// Re-export public types
pub use circles::{circle_radius, circles, Circle};
pub use draw_list::{DrawList, Shape, Vertex};
pub use lissajous::{curve_amplitude, curves, Curve};

use glam::Vec2;

use crate::params::VisualMapping;
use crate::store::ParameterSet;

/// RGBA color with components in 0..=1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn from_rgb8([r, g, b]: [u8; 3]) -> Self {
        Self::rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Fully saturated color at `hue` turns around the color wheel
    pub fn from_hue(hue: f32) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let x = 1.0 - (h % 2.0 - 1.0).abs();
        let (r, g, b) = match h as u32 {
            0 => (1.0, x, 0.0),
            1 => (x, 1.0, 0.0),
            2 => (0.0, 1.0, x),
            3 => (0.0, x, 1.0),
            4 => (x, 0.0, 1.0),
            _ => (1.0, 0.0, x),
        };
        Self::rgb(r, g, b)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Drawing surface the animation loop renders into (pixel coordinates,
/// origin top-left, y down)
pub trait Canvas {
    fn width(&self) -> f32;

    fn height(&self) -> f32;

    /// Clear the whole canvas
    fn background(&mut self, color: Color);

    /// Filled ellipse; `size` is the full width and height
    fn fill_ellipse(&mut self, center: Vec2, size: Vec2, color: Color);

    /// Stroked polyline, optionally closed back to its first point
    fn stroke_polyline(&mut self, points: &[Vec2], closed: bool, color: Color, weight: f32);
}

/// Linear re-mapping of `value` from one range to another (not clamped)
pub fn map_range(value: f32, from: (f32, f32), to: (f32, f32)) -> f32 {
    let span = from.1 - from.0;
    if span == 0.0 {
        return to.0;
    }
    to.0 + (value - from.0) / span * (to.1 - to.0)
}

/// Everything a frame may read: current canvas size and the parameters
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub width: f32,
    pub height: f32,
    pub params: &'a ParameterSet,
}

/// Free-running per-frame callback for one instrument
#[derive(Debug, Clone)]
pub struct AnimationLoop {
    mapping: VisualMapping,
    background: Color,
}

impl AnimationLoop {
    pub fn new(mapping: VisualMapping, background: Color) -> Self {
        Self {
            mapping,
            background,
        }
    }

    /// Render one frame, then advance the motion accumulator if the
    /// instrument was playing when the frame started
    pub fn frame(&self, params: &mut ParameterSet, canvas: &mut impl Canvas) {
        let playing = params.is_playing();

        let ctx = RenderContext {
            width: canvas.width(),
            height: canvas.height(),
            params: &*params,
        };
        canvas.background(self.background);
        match &self.mapping {
            VisualMapping::Circles(layout) => {
                for circle in circles(layout, &ctx) {
                    let diameter = Vec2::splat(circle.radius * 2.0);
                    canvas.fill_ellipse(circle.center, diameter, circle.color);
                }
            }
            VisualMapping::Lissajous(layout) => {
                for curve in curves(layout, &ctx) {
                    canvas.stroke_polyline(
                        &curve.points,
                        true,
                        curve.color,
                        layout.stroke_weight_px,
                    );
                }
            }
        }

        if playing {
            params.motion_mut().advance(self.step());
        }
    }

    /// Accumulator advance per playing frame
    pub fn step(&self) -> f32 {
        match &self.mapping {
            VisualMapping::Circles(layout) => layout.phase_step,
            VisualMapping::Lissajous(layout) => layout.time_step,
        }
    }
}

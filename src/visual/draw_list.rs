//! Canvas that records shapes and tessellates them into GPU triangles.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use std::f32::consts::TAU;

use super::{Canvas, Color};

/// Vertex data for 2D shapes (clip-space position + color)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

/// A shape recorded during a frame (pixel coordinates)
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Ellipse {
        center: Vec2,
        size: Vec2,
        color: Color,
    },
    Polyline {
        points: Vec<Vec2>,
        closed: bool,
        color: Color,
        weight: f32,
    },
}

/// Shapes of one frame plus the canvas size they were drawn for
#[derive(Debug, Clone)]
pub struct DrawList {
    width: f32,
    height: f32,
    background: Color,
    shapes: Vec<Shape>,
}

impl DrawList {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            background: Color::BLACK,
            shapes: Vec::new(),
        }
    }

    /// Track a window resize; takes effect from the next frame.
    /// Zero-sized (minimized) windows keep the previous size.
    pub fn resize(&mut self, width: f32, height: f32) {
        if width > 0.0 && height > 0.0 {
            self.width = width;
            self.height = height;
        }
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn background_color(&self) -> Color {
        self.background
    }

    /// Triangle list in clip space, ellipses as fans of `segments` triangles
    pub fn tessellate(&self, segments: usize) -> Vec<Vertex> {
        let mut vertices = Vec::new();
        for shape in &self.shapes {
            match shape {
                Shape::Ellipse {
                    center,
                    size,
                    color,
                } => self.push_ellipse(&mut vertices, *center, *size, *color, segments),
                Shape::Polyline {
                    points,
                    closed,
                    color,
                    weight,
                } => self.push_polyline(&mut vertices, points, *closed, *color, *weight),
            }
        }
        vertices
    }

    /// Pixel coordinates (origin top-left, y down) to clip space
    fn to_clip(&self, p: Vec2) -> [f32; 2] {
        [
            p.x / self.width * 2.0 - 1.0,
            1.0 - p.y / self.height * 2.0,
        ]
    }

    fn push_ellipse(
        &self,
        out: &mut Vec<Vertex>,
        center: Vec2,
        size: Vec2,
        color: Color,
        segments: usize,
    ) {
        let radii = size / 2.0;
        let color = color.to_array();
        let rim = |i: usize| {
            let angle = i as f32 / segments as f32 * TAU;
            center + Vec2::new(angle.cos(), angle.sin()) * radii
        };

        for i in 0..segments {
            for p in [center, rim(i), rim(i + 1)] {
                out.push(Vertex {
                    position: self.to_clip(p),
                    color,
                });
            }
        }
    }

    fn push_polyline(
        &self,
        out: &mut Vec<Vertex>,
        points: &[Vec2],
        closed: bool,
        color: Color,
        weight: f32,
    ) {
        let color = color.to_array();
        let closing = if closed && points.len() > 2 {
            points.last().zip(points.first())
        } else {
            None
        };
        let segments = points
            .windows(2)
            .map(|pair| (&pair[0], &pair[1]))
            .chain(closing);

        // Each segment is a quad of two triangles
        for (&a, &b) in segments {
            let normal = (b - a).normalize_or_zero().perp() * (weight / 2.0);
            for p in [a + normal, a - normal, b + normal, b + normal, a - normal, b - normal] {
                out.push(Vertex {
                    position: self.to_clip(p),
                    color,
                });
            }
        }
    }
}

impl Canvas for DrawList {
    fn width(&self) -> f32 {
        self.width
    }

    fn height(&self) -> f32 {
        self.height
    }

    fn background(&mut self, color: Color) {
        self.background = color;
        self.shapes.clear();
    }

    fn fill_ellipse(&mut self, center: Vec2, size: Vec2, color: Color) {
        self.shapes.push(Shape::Ellipse {
            center,
            size,
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[Vec2], closed: bool, color: Color, weight: f32) {
        if points.len() < 2 {
            return;
        }
        self.shapes.push(Shape::Polyline {
            points: points.to_vec(),
            closed,
            color,
            weight,
        });
    }
}

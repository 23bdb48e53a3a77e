//! Lissajous mapping: one closed curve per oscillator, drifting with time.

use glam::Vec2;
use std::f32::consts::TAU;

use super::{map_range, Color, RenderContext};
use crate::params::LissajousLayout;
use crate::store::Motion;

/// One closed curve of the frame
#[derive(Debug, Clone, PartialEq)]
pub struct Curve {
    pub points: Vec<Vec2>,
    pub color: Color,
}

/// Amplitude (pixels) along an axis of `half_extent` for `frequency_hz`
pub fn curve_amplitude(layout: &LissajousLayout, frequency_hz: f32, half_extent: f32) -> f32 {
    map_range(
        frequency_hz,
        layout.frequency_domain_hz,
        (half_extent * layout.min_amplitude_fraction, half_extent),
    )
}

/// Geometry for the current frame
pub fn curves(layout: &LissajousLayout, ctx: &RenderContext) -> Vec<Curve> {
    let time = match ctx.params.motion() {
        Motion::Time(time) => time,
        Motion::PhasePair([phase, _]) => phase,
    };
    let center = Vec2::new(ctx.width / 2.0, ctx.height / 2.0);
    let samples = (TAU / layout.angle_step).ceil() as usize;
    let count = ctx.params.oscillator_count();

    ctx.params
        .frequencies()
        .iter()
        .enumerate()
        .map(|(index, &frequency_hz)| {
            let x_amplitude = curve_amplitude(layout, frequency_hz, ctx.width / 2.0);
            let y_amplitude = curve_amplitude(layout, frequency_hz, ctx.height / 2.0);
            let drift = time * layout.drift_per_time * (index + 1) as f32;

            let points = (0..samples)
                .map(|k| {
                    let t = k as f32 * layout.angle_step;
                    center
                        + Vec2::new(
                            x_amplitude * (t + drift).sin(),
                            y_amplitude * (2.0 * t + drift).sin(),
                        )
                })
                .collect();

            Curve {
                points,
                color: Color::from_hue(index as f32 / count as f32),
            }
        })
        .collect()
}

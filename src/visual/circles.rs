//! Circle mapping: frequency → radius, phase → horizontal position.

use glam::Vec2;

use super::{map_range, Color, RenderContext};
use crate::params::CircleLayout;
use crate::store::Motion;

/// One circle of the frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
    pub color: Color,
}

/// Radius (pixels) for an oscillator at `frequency_hz`
pub fn circle_radius(layout: &CircleLayout, frequency_hz: f32) -> f32 {
    map_range(frequency_hz, layout.frequency_domain_hz, layout.radius_range_px)
}

/// Geometry for the current frame, one circle per active oscillator (max 2)
pub fn circles(layout: &CircleLayout, ctx: &RenderContext) -> Vec<Circle> {
    let phases = match ctx.params.motion() {
        Motion::PhasePair(phases) => phases,
        Motion::Time(time) => [time, time],
    };
    let x_range = (layout.margin_px, ctx.width - layout.margin_px);

    ctx.params
        .frequencies()
        .iter()
        .zip(phases)
        .zip(layout.row_offsets_px.iter().zip(layout.colors))
        .map(|((&frequency_hz, phase), (&row_offset, rgb))| Circle {
            center: Vec2::new(
                map_range(phase.sin(), (-1.0, 1.0), x_range),
                ctx.height / 2.0 + row_offset,
            ),
            radius: circle_radius(layout, frequency_hz),
            color: Color::from_rgb8(rgb),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::InstrumentConfig;
    use crate::store::ParameterSet;

    #[test]
    fn test_radius_monotonic_over_domain() {
        let layout = CircleLayout::default();
        let mut previous = circle_radius(&layout, 100.0);
        assert_eq!(previous, 50.0);
        for step in 1..=90 {
            let radius = circle_radius(&layout, 100.0 + step as f32 * 10.0);
            assert!(radius > previous);
            previous = radius;
        }
        assert!((previous - 200.0).abs() < 1e-3);
    }

    #[test]
    fn test_circle_positions() {
        let config = InstrumentConfig::circles();
        let params = ParameterSet::new(&config);
        let ctx = RenderContext {
            width: 800.0,
            height: 600.0,
            params: &params,
        };

        let frame = circles(&CircleLayout::default(), &ctx);
        assert_eq!(frame.len(), 2);

        // Phase 0: sin = 0 → centre of the 100..700 track
        assert!((frame[0].center.x - 400.0).abs() < 1e-3);
        assert_eq!(frame[0].center.y, 300.0);
        assert_eq!(frame[1].center.y, 400.0);
        assert_eq!(frame[0].color, Color::from_rgb8([148, 0, 211]));

        let track = 100.0..=700.0;
        assert!(track.contains(&frame[1].center.x));
    }

    #[test]
    fn test_positions_follow_canvas_size() {
        let params = ParameterSet::new(&InstrumentConfig::circles());
        let layout = CircleLayout::default();

        let small = RenderContext {
            width: 400.0,
            height: 300.0,
            params: &params,
        };
        let large = RenderContext {
            width: 1600.0,
            height: 900.0,
            params: &params,
        };
        assert!((circles(&layout, &small)[0].center.x - 200.0).abs() < 1e-3);
        assert!((circles(&layout, &large)[0].center.x - 800.0).abs() < 1e-3);
    }
}

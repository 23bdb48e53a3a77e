//! Visual mapping presets for the animation loop.

/// Visual mapping selection
#[derive(Debug, Clone)]
pub enum VisualMapping {
    /// Two filled circles: frequency → radius, phase → horizontal position
    Circles(CircleLayout),

    /// One closed Lissajous curve per oscillator
    Lissajous(LissajousLayout),
}

/// Circle mapping parameters
#[derive(Debug, Clone)]
pub struct CircleLayout {
    /// Frequency domain mapped onto the radius range (Hz)
    pub frequency_domain_hz: (f32, f32),

    /// Radius range (pixels)
    pub radius_range_px: (f32, f32),

    /// Horizontal margin kept free on both sides (pixels)
    pub margin_px: f32,

    /// Vertical offset of each circle below the canvas centre (pixels)
    pub row_offsets_px: [f32; 2],

    /// Fill color per circle (RGB)
    pub colors: [[u8; 3]; 2],

    /// Initial phase per circle (radians)
    pub initial_phases: [f32; 2],

    /// Phase advance per rendered frame while playing (radians)
    pub phase_step: f32,
}

impl Default for CircleLayout {
    fn default() -> Self {
        Self {
            frequency_domain_hz: (100.0, 1000.0),
            radius_range_px: (50.0, 200.0),
            margin_px: 100.0,
            row_offsets_px: [0.0, 100.0],
            colors: [[148, 0, 211], [0, 255, 0]],
            initial_phases: [0.0, 90.0],
            phase_step: 0.01,
        }
    }
}

/// Lissajous mapping parameters
#[derive(Debug, Clone)]
pub struct LissajousLayout {
    /// Frequency domain mapped onto the amplitude range (Hz)
    pub frequency_domain_hz: (f32, f32),

    /// Smallest amplitude as a fraction of the half canvas extent
    pub min_amplitude_fraction: f32,

    /// Parametric sampling step over one full turn (radians)
    pub angle_step: f32,

    /// Phase drift per unit of animation time, multiplied by (index + 1)
    pub drift_per_time: f32,

    /// Time advance per rendered frame while playing
    pub time_step: f32,

    /// Stroke weight (pixels)
    pub stroke_weight_px: f32,
}

impl Default for LissajousLayout {
    fn default() -> Self {
        Self {
            frequency_domain_hz: (100.0, 1000.0),
            min_amplitude_fraction: 0.1,
            angle_step: 0.02,
            drift_per_time: 0.01,
            time_step: 1.0,
            stroke_weight_px: 2.0,
        }
    }
}

//! Instrument presets: parameter ranges, defaults and graph policy.

use super::visual::{CircleLayout, LissajousLayout, VisualMapping};

/// Which of the two instruments to build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    /// Two oscillators drawn as sliding circles
    Circles,

    /// N oscillators drawn as Lissajous curves
    Lissajous,
}

/// How oscillator nodes live across start/stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphLifecycle {
    /// Oscillators are allocated once and only silenced on stop
    Persistent,

    /// The whole node set is discarded on stop and rebuilt on every start
    Rebuild,
}

/// Frequencies assigned to oscillators that have no user-set value yet
#[derive(Debug, Clone, Copy)]
pub struct FrequencyLayout {
    /// Frequency of oscillator 0 (Hz)
    pub base_hz: f32,

    /// Spacing between consecutive oscillators (Hz)
    pub spacing_hz: f32,
}

impl FrequencyLayout {
    /// Derived frequency for the oscillator at `index`
    pub fn frequency_for(&self, index: usize) -> f32 {
        self.base_hz + index as f32 * self.spacing_hz
    }
}

impl Default for FrequencyLayout {
    fn default() -> Self {
        Self {
            base_hz: 220.0,
            spacing_hz: 50.0,
        }
    }
}

/// Full configuration of one visual instrument
#[derive(Debug, Clone)]
pub struct InstrumentConfig {
    pub kind: InstrumentKind,

    /// Accepted oscillator frequencies (Hz), also the visual mapping domain
    pub frequency_range_hz: (f32, f32),

    /// Accepted oscillator counts (inclusive)
    pub oscillator_count_range: (usize, usize),

    /// Initial frequencies; the initial count is their length
    pub default_frequencies_hz: Vec<f32>,

    /// Frequencies for oscillators added after construction
    pub frequency_layout: FrequencyLayout,

    /// Master volume range (dB)
    pub volume_range_db: (f32, f32),
    pub default_volume_db: f32,

    /// Reverb wetness upper bound (0 = dry, max = fully processed)
    pub max_reverb_wetness: f32,
    pub default_reverb_wetness: f32,

    /// Reverb tail length upper bound (seconds)
    pub max_reverb_decay_s: f32,
    pub default_reverb_decay_s: f32,

    pub mapping: VisualMapping,
    pub lifecycle: GraphLifecycle,
}

impl InstrumentConfig {
    /// Two fixed oscillators, circles, oscillators persist across stop
    pub fn circles() -> Self {
        Self {
            kind: InstrumentKind::Circles,
            frequency_range_hz: (100.0, 1000.0),
            oscillator_count_range: (2, 2),
            default_frequencies_hz: vec![220.0, 330.0],
            frequency_layout: FrequencyLayout::default(),
            volume_range_db: (-60.0, 0.0),
            default_volume_db: -12.0,
            max_reverb_wetness: 5.0,
            default_reverb_wetness: 1.0, // Start with full reverb
            max_reverb_decay_s: 20.0,
            default_reverb_decay_s: 10.0, // Long tail
            mapping: VisualMapping::Circles(CircleLayout::default()),
            lifecycle: GraphLifecycle::Persistent,
        }
    }

    /// Up to eight oscillators, Lissajous curves, graph rebuilt on every start
    pub fn lissajous() -> Self {
        let layout = FrequencyLayout::default();
        Self {
            kind: InstrumentKind::Lissajous,
            frequency_range_hz: (100.0, 1000.0),
            oscillator_count_range: (1, 8),
            default_frequencies_hz: (0..3).map(|i| layout.frequency_for(i)).collect(),
            frequency_layout: layout,
            volume_range_db: (-60.0, 0.0),
            default_volume_db: -15.0,
            max_reverb_wetness: 5.0,
            default_reverb_wetness: 1.0,
            max_reverb_decay_s: 20.0,
            default_reverb_decay_s: 10.0,
            mapping: VisualMapping::Lissajous(LissajousLayout::default()),
            lifecycle: GraphLifecycle::Rebuild,
        }
    }

    pub fn for_kind(kind: InstrumentKind) -> Self {
        match kind {
            InstrumentKind::Circles => Self::circles(),
            InstrumentKind::Lissajous => Self::lissajous(),
        }
    }

    pub fn clamp_frequency(&self, hz: f32) -> f32 {
        hz.clamp(self.frequency_range_hz.0, self.frequency_range_hz.1)
    }

    pub fn clamp_oscillator_count(&self, count: usize) -> usize {
        count.clamp(self.oscillator_count_range.0, self.oscillator_count_range.1)
    }

    pub fn clamp_volume(&self, db: f32) -> f32 {
        db.clamp(self.volume_range_db.0, self.volume_range_db.1)
    }

    pub fn clamp_wetness(&self, wetness: f32) -> f32 {
        wetness.clamp(0.0, self.max_reverb_wetness)
    }

    pub fn clamp_decay(&self, decay_s: f32) -> f32 {
        decay_s.clamp(0.0, self.max_reverb_decay_s)
    }

    /// Validate configuration (non-empty ranges, defaults inside them)
    pub fn validate(&self) -> Result<(), String> {
        let (min_count, max_count) = self.oscillator_count_range;
        if min_count == 0 || min_count > max_count {
            return Err(format!(
                "Oscillator count range must be 1.. and non-empty, got {}..={}",
                min_count, max_count
            ));
        }
        let count = self.default_frequencies_hz.len();
        if count < min_count || count > max_count {
            return Err(format!(
                "Default oscillator count {} outside {}..={}",
                count, min_count, max_count
            ));
        }
        let (low_hz, high_hz) = self.frequency_range_hz;
        if !(low_hz > 0.0 && low_hz < high_hz) {
            return Err(format!(
                "Frequency range must be positive and increasing, got {}..{}",
                low_hz, high_hz
            ));
        }
        if self.max_reverb_wetness <= 0.0 || self.max_reverb_decay_s < 0.0 {
            return Err("Reverb bounds must be positive".to_string());
        }
        Ok(())
    }
}

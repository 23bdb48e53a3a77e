//! Parameter store: the single source of truth shared by audio and visuals.
//!
//! Setters only store values. Range checks happen in the control surface,
//! and pushing values into the signal graph is the caller's job.

use crate::params::audio_constants::COMPENSATION_DB_PER_DOUBLING;
use crate::params::{FrequencyLayout, InstrumentConfig, VisualMapping};

/// Animation accumulator, advanced once per frame while playing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// Independent phase per circle (radians)
    PhasePair([f32; 2]),

    /// Shared animation time for all curves
    Time(f32),
}

impl Motion {
    /// Advance by one frame's worth of `step`
    pub fn advance(&mut self, step: f32) {
        match self {
            Motion::PhasePair(phases) => {
                phases[0] += step;
                phases[1] += step;
            }
            Motion::Time(time) => *time += step,
        }
    }
}

/// Current user-set values of one instrument
#[derive(Debug, Clone)]
pub struct ParameterSet {
    frequencies_hz: Vec<f32>,
    layout: FrequencyLayout,
    volume_db: f32,
    reverb_wetness: f32,
    reverb_decay_s: f32,
    is_playing: bool,
    motion: Motion,
}

impl ParameterSet {
    /// Create a store holding the defaults of `config`
    pub fn new(config: &InstrumentConfig) -> Self {
        let motion = match &config.mapping {
            VisualMapping::Circles(layout) => Motion::PhasePair(layout.initial_phases),
            VisualMapping::Lissajous(_) => Motion::Time(0.0),
        };

        Self {
            frequencies_hz: config.default_frequencies_hz.clone(),
            layout: config.frequency_layout,
            volume_db: config.default_volume_db,
            reverb_wetness: config.default_reverb_wetness,
            reverb_decay_s: config.default_reverb_decay_s,
            is_playing: false,
            motion,
        }
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies_hz
    }

    pub fn frequency(&self, index: usize) -> Option<f32> {
        self.frequencies_hz.get(index).copied()
    }

    /// Store one frequency; returns false if `index` is not an active oscillator
    pub fn set_frequency(&mut self, index: usize, hz: f32) -> bool {
        match self.frequencies_hz.get_mut(index) {
            Some(slot) => {
                *slot = hz;
                true
            }
            None => false,
        }
    }

    pub fn oscillator_count(&self) -> usize {
        self.frequencies_hz.len()
    }

    /// Resize the oscillator set. Kept oscillators retain their frequency,
    /// new ones take the layout-derived frequency for their index.
    pub fn set_oscillator_count(&mut self, count: usize) {
        let layout = self.layout;
        let current = self.frequencies_hz.len();
        if count <= current {
            self.frequencies_hz.truncate(count);
        } else {
            self.frequencies_hz
                .extend((current..count).map(|i| layout.frequency_for(i)));
        }
    }

    pub fn volume_db(&self) -> f32 {
        self.volume_db
    }

    pub fn set_volume_db(&mut self, db: f32) {
        self.volume_db = db;
    }

    /// Volume applied to each oscillator: master volume minus
    /// 3 dB per doubling of the oscillator count
    pub fn voice_volume_db(&self) -> f32 {
        let count = self.oscillator_count().max(1) as f32;
        self.volume_db - COMPENSATION_DB_PER_DOUBLING * count.log2()
    }

    pub fn reverb_wetness(&self) -> f32 {
        self.reverb_wetness
    }

    pub fn set_reverb_wetness(&mut self, wetness: f32) {
        self.reverb_wetness = wetness;
    }

    pub fn reverb_decay_s(&self) -> f32 {
        self.reverb_decay_s
    }

    pub fn set_reverb_decay_s(&mut self, decay_s: f32) {
        self.reverb_decay_s = decay_s;
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn set_playing(&mut self, playing: bool) {
        self.is_playing = playing;
    }

    pub fn motion(&self) -> Motion {
        self.motion
    }

    pub fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_config() {
        let params = ParameterSet::new(&InstrumentConfig::circles());
        assert_eq!(params.frequencies(), &[220.0, 330.0]);
        assert_eq!(params.motion(), Motion::PhasePair([0.0, 90.0]));
        assert!(!params.is_playing());

        let params = ParameterSet::new(&InstrumentConfig::lissajous());
        assert_eq!(params.oscillator_count(), 3);
        assert_eq!(params.motion(), Motion::Time(0.0));
    }

    #[test]
    fn test_resize_keeps_assigned_frequencies() {
        let mut params = ParameterSet::new(&InstrumentConfig::lissajous());
        params.set_frequency(0, 440.0);

        params.set_oscillator_count(5);
        assert_eq!(params.frequencies(), &[440.0, 270.0, 320.0, 370.0, 420.0]);

        params.set_oscillator_count(1);
        assert_eq!(params.frequencies(), &[440.0]);
    }

    #[test]
    fn test_set_frequency_out_of_range_index() {
        let mut params = ParameterSet::new(&InstrumentConfig::circles());
        assert!(!params.set_frequency(2, 500.0));
        assert_eq!(params.frequencies(), &[220.0, 330.0]);
    }

    #[test]
    fn test_voice_volume_compensation() {
        let mut params = ParameterSet::new(&InstrumentConfig::lissajous());
        params.set_volume_db(-15.0);
        params.set_oscillator_count(3);
        let expected = -15.0 - 3.0 * 3.0_f32.log2();
        assert!((params.voice_volume_db() - expected).abs() < 1e-5);

        params.set_oscillator_count(1);
        assert_eq!(params.voice_volume_db(), -15.0);
    }

    #[test]
    fn test_motion_advance() {
        let mut motion = Motion::PhasePair([0.0, 90.0]);
        motion.advance(0.01);
        let Motion::PhasePair([a, b]) = motion else {
            panic!("motion changed variant");
        };
        assert!((a - 0.01).abs() < 1e-6);
        assert!((b - 90.01).abs() < 1e-4);

        let mut motion = Motion::Time(3.0);
        motion.advance(1.0);
        assert_eq!(motion, Motion::Time(4.0));
    }
}

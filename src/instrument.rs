//! Visual instrument: parameter store, signal graph controller and animation
//! loop behind one control surface.
//!
//! Every mutator clamps its input, commits it to the store and then pushes
//! it into the graph, so the next frame and the graph see the same values.

use log::debug;

use crate::audio::{GraphController, SignalGraph};
use crate::error::InstrumentError;
use crate::params::InstrumentConfig;
use crate::store::ParameterSet;
use crate::visual::{AnimationLoop, Canvas, Color};

/// One playable audio-visual instrument
pub struct VisualInstrument<G: SignalGraph> {
    config: InstrumentConfig,
    params: ParameterSet,
    controller: GraphController<G>,
    animation: AnimationLoop,
}

impl<G: SignalGraph> VisualInstrument<G> {
    /// Create an instrument in the stopped state; no audio nodes exist yet
    pub fn new(config: InstrumentConfig, graph: G) -> Self {
        Self::with_background(config, graph, Color::BLACK)
    }

    pub fn with_background(config: InstrumentConfig, graph: G, background: Color) -> Self {
        let params = ParameterSet::new(&config);
        let controller = GraphController::new(graph, config.lifecycle, config.max_reverb_wetness);
        let animation = AnimationLoop::new(config.mapping.clone(), background);
        Self {
            config,
            params,
            controller,
            animation,
        }
    }

    /// Read-only view of the current parameters
    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn controller(&self) -> &GraphController<G> {
        &self.controller
    }

    pub fn is_playing(&self) -> bool {
        self.params.is_playing()
    }

    /// Render one frame of the animation loop
    pub fn frame(&mut self, canvas: &mut impl Canvas) {
        self.animation.frame(&mut self.params, canvas);
    }

    pub fn start(&mut self) -> Result<(), InstrumentError> {
        self.controller.start(&mut self.params)?;
        Ok(())
    }

    pub fn stop(&mut self) {
        self.controller.stop(&mut self.params);
    }

    /// Start if stopped, stop if playing; returns the new play state
    pub fn toggle(&mut self) -> Result<bool, InstrumentError> {
        if self.params.is_playing() {
            self.stop();
        } else {
            self.start()?;
        }
        Ok(self.params.is_playing())
    }

    /// Set one oscillator frequency (Hz), clamped to the instrument range
    pub fn set_frequency(&mut self, index: usize, hz: f32) -> Result<(), InstrumentError> {
        let hz = self.checked(hz, "frequency")?;
        let count = self.params.oscillator_count();
        if !self.params.set_frequency(index, self.config.clamp_frequency(hz)) {
            return Err(InstrumentError::NoSuchOscillator { index, count });
        }
        self.apply()
    }

    /// Set the leading oscillator frequencies in one commit
    pub fn set_frequencies(&mut self, frequencies_hz: &[f32]) -> Result<(), InstrumentError> {
        let count = self.params.oscillator_count();
        if frequencies_hz.len() > count {
            return Err(InstrumentError::NoSuchOscillator {
                index: frequencies_hz.len() - 1,
                count,
            });
        }
        for &hz in frequencies_hz {
            self.checked(hz, "frequency")?;
        }
        for (index, &hz) in frequencies_hz.iter().enumerate() {
            self.params
                .set_frequency(index, self.config.clamp_frequency(hz));
        }
        self.apply()
    }

    /// Change the number of oscillators; rebuilds the graph
    pub fn set_oscillator_count(&mut self, count: usize) -> Result<(), InstrumentError> {
        let count = self.config.clamp_oscillator_count(count);
        if count == self.params.oscillator_count() {
            return Ok(());
        }
        debug!(
            "Oscillator count {} -> {}",
            self.params.oscillator_count(),
            count
        );
        self.params.set_oscillator_count(count);
        self.controller.set_oscillator_count(&mut self.params)?;
        Ok(())
    }

    pub fn set_reverb_wetness(&mut self, wetness: f32) -> Result<(), InstrumentError> {
        let wetness = self.checked(wetness, "reverb wetness")?;
        self.params
            .set_reverb_wetness(self.config.clamp_wetness(wetness));
        self.apply()
    }

    pub fn set_reverb_decay(&mut self, decay_s: f32) -> Result<(), InstrumentError> {
        let decay_s = self.checked(decay_s, "reverb decay")?;
        self.params
            .set_reverb_decay_s(self.config.clamp_decay(decay_s));
        self.apply()
    }

    pub fn set_volume_db(&mut self, db: f32) -> Result<(), InstrumentError> {
        let db = self.checked(db, "volume")?;
        self.params.set_volume_db(self.config.clamp_volume(db));
        self.apply()
    }

    /// Release all audio resources and stop. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        self.controller.dispose(&mut self.params);
    }

    fn apply(&mut self) -> Result<(), InstrumentError> {
        self.controller.apply_parameters(&self.params)?;
        Ok(())
    }

    fn checked(&self, value: f32, field: &'static str) -> Result<f32, InstrumentError> {
        if value.is_nan() {
            return Err(InstrumentError::InvalidInput { field, value });
        }
        Ok(value)
    }
}

//! Glicol/cpal signal graph: the node graph compiled into a live Glicol
//! program and played on the default output device.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use glicol::Engine;
use log::{info, warn};
use std::sync::{Arc, Mutex};

use super::patch::{compile, SILENCE};
use super::{NodeId, SignalGraph, VirtualGraph};
use crate::error::GraphError;
use crate::params::audio_constants::{BLOCK_SIZE, MAX_NODES, SAFETY_LIMIT};

/// Signal graph that produces sound through Glicol
pub struct GlicolGraph {
    /// Node bookkeeping; the source of every compiled program
    nodes: VirtualGraph,

    /// Engine shared with the audio callback
    engine: Arc<Mutex<Engine<BLOCK_SIZE>>>,

    /// Open `begin_batch` calls; edits reach the engine only at zero
    batch_depth: usize,

    /// Audio output stream (kept alive)
    _stream: cpal::Stream,
}

impl GlicolGraph {
    /// Open the default output device and start streaming silence
    pub fn new() -> Result<Self, GraphError> {
        // Setup audio output device
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| GraphError::Device("No audio output device found".to_string()))?;

        let config = device
            .default_output_config()
            .map_err(|e| GraphError::Device(format!("Failed to get audio config: {}", e)))?;

        let sample_rate_hz = config.sample_rate().0;
        let channels = config.channels() as usize;
        info!(
            "Audio: {} @ {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate_hz,
            channels
        );

        // Create Glicol engine
        let mut engine = Engine::<BLOCK_SIZE>::new();
        engine.set_sr(sample_rate_hz as usize);
        engine.update_with_code(SILENCE);
        engine
            .update()
            .map_err(|e| GraphError::Engine(format!("Glicol engine init failed: {:?}", e)))?;

        let engine = Arc::new(Mutex::new(engine));
        let engine_clone = Arc::clone(&engine);

        // Build audio output stream
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut engine) = engine_clone.lock() else {
                        data.fill(0.0);
                        return;
                    };

                    let frames_needed = data.len() / channels;
                    let mut frame_idx = 0;

                    // Generate multiple blocks if needed to fill the entire buffer
                    while frame_idx < frames_needed {
                        let (buffers, _) = engine.next_block(vec![]);

                        let samples_to_copy = (frames_needed - frame_idx).min(BLOCK_SIZE);

                        for i in 0..samples_to_copy {
                            // Safety limiter: hard clip to prevent ear damage
                            let left = buffers[0][i].clamp(-SAFETY_LIMIT, SAFETY_LIMIT);
                            let right = buffers[1][i].clamp(-SAFETY_LIMIT, SAFETY_LIMIT);

                            let out_idx = (frame_idx + i) * channels;
                            for (ch, sample) in data[out_idx..out_idx + channels]
                                .iter_mut()
                                .enumerate()
                            {
                                *sample = if ch % 2 == 0 { left } else { right };
                            }
                        }

                        frame_idx += samples_to_copy;
                    }
                },
                |err| warn!("Audio stream error: {}", err),
                None,
            )
            .map_err(|e| GraphError::Device(format!("Failed to build audio stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| GraphError::Device(format!("Failed to start audio stream: {}", e)))?;

        Ok(Self {
            nodes: VirtualGraph::with_capacity(MAX_NODES),
            engine,
            batch_depth: 0,
            _stream: stream,
        })
    }

    /// Apply `edit` to the node graph and hot-swap the compiled program.
    /// The graph is rolled back if the engine rejects the new program.
    /// Inside a batch only the node graph changes.
    fn edit<T>(
        &mut self,
        edit: impl FnOnce(&mut VirtualGraph) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        if self.batch_depth > 0 {
            return edit(&mut self.nodes);
        }

        let snapshot = self.nodes.clone();
        let value = edit(&mut self.nodes)?;

        if let Err(e) = self.load(&compile(&self.nodes)) {
            self.nodes = snapshot;
            if let Err(restore) = self.load(&compile(&self.nodes)) {
                warn!("Failed to restore previous program: {}", restore);
            }
            return Err(e);
        }
        Ok(value)
    }

    /// Edits that cannot fail on the node graph; engine errors are logged
    fn edit_infallible(&mut self, edit: impl FnOnce(&mut VirtualGraph)) {
        edit(&mut self.nodes);
        if self.batch_depth > 0 {
            return;
        }
        if let Err(e) = self.load(&compile(&self.nodes)) {
            warn!("Audio program update failed: {}", e);
        }
    }

    fn load(&self, code: &str) -> Result<(), GraphError> {
        let mut engine = self
            .engine
            .lock()
            .map_err(|_| GraphError::Engine("Engine lock poisoned".to_string()))?;
        engine.update_with_code(code);
        engine
            .update()
            .map_err(|e| GraphError::Engine(format!("{:?}", e)))
    }
}

impl SignalGraph for GlicolGraph {
    fn create_oscillator(
        &mut self,
        frequency_hz: f32,
        volume_db: f32,
    ) -> Result<NodeId, GraphError> {
        self.edit(|nodes| nodes.create_oscillator(frequency_hz, volume_db))
    }

    fn create_reverb(&mut self, decay_s: f32, wetness: f32) -> Result<NodeId, GraphError> {
        self.edit(|nodes| nodes.create_reverb(decay_s, wetness))
    }

    fn connect(&mut self, oscillator: NodeId, reverb: NodeId) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.connect(oscillator, reverb))
    }

    fn connect_to_output(&mut self, reverb: NodeId) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.connect_to_output(reverb))
    }

    fn set_frequency(&mut self, oscillator: NodeId, frequency_hz: f32) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.set_frequency(oscillator, frequency_hz))
    }

    fn set_volume(&mut self, oscillator: NodeId, volume_db: f32) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.set_volume(oscillator, volume_db))
    }

    fn set_wetness(&mut self, reverb: NodeId, wetness: f32) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.set_wetness(reverb, wetness))
    }

    fn start(&mut self, oscillator: NodeId) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.start(oscillator))
    }

    fn stop(&mut self, oscillator: NodeId) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.stop(oscillator))
    }

    fn dispose(&mut self, node: NodeId) {
        self.edit_infallible(|nodes| nodes.dispose(node));
    }

    fn start_transport(&mut self) -> Result<(), GraphError> {
        self.edit(|nodes| nodes.start_transport())
    }

    fn stop_transport(&mut self) {
        self.edit_infallible(|nodes| nodes.stop_transport());
    }

    fn begin_batch(&mut self) {
        self.batch_depth += 1;
    }

    fn end_batch(&mut self) -> Result<(), GraphError> {
        self.batch_depth = self.batch_depth.saturating_sub(1);
        if self.batch_depth > 0 {
            return Ok(());
        }
        // Node edits already succeeded; a rejected program leaves the
        // engine on the last good one until the next update
        self.load(&compile(&self.nodes))
    }
}

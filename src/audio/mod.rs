//! Signal graph: provider interface, lifecycle controller and backends.
//!
//! The controller only talks to a [`SignalGraph`], so the same lifecycle
//! logic drives the Glicol/cpal engine and the in-memory graph.

mod controller;
mod patch;
mod system;
mod virtual_graph;

// Re-export public types
pub use controller::GraphController;
pub use patch::{compile, reverb_taps, ReverbTap, SILENCE};
pub use system::GlicolGraph;
pub use virtual_graph::{VirtualGraph, VirtualOscillator, VirtualReverb};

use crate::error::GraphError;

/// Opaque handle to a node owned by a signal graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

/// Capability set a signal graph provider exposes to the controller.
///
/// Wetness is passed normalized to `0.0..=1.0`. Reverb decay is fixed at
/// construction; changing it means creating a new reverb.
pub trait SignalGraph {
    /// Allocate a silent sine oscillator
    fn create_oscillator(&mut self, frequency_hz: f32, volume_db: f32)
        -> Result<NodeId, GraphError>;

    /// Allocate a reverb with a fixed decay (seconds)
    fn create_reverb(&mut self, decay_s: f32, wetness: f32) -> Result<NodeId, GraphError>;

    /// Route an oscillator into a reverb, replacing any previous route
    fn connect(&mut self, oscillator: NodeId, reverb: NodeId) -> Result<(), GraphError>;

    /// Route a reverb to the audio output
    fn connect_to_output(&mut self, reverb: NodeId) -> Result<(), GraphError>;

    fn set_frequency(&mut self, oscillator: NodeId, frequency_hz: f32) -> Result<(), GraphError>;

    fn set_volume(&mut self, oscillator: NodeId, volume_db: f32) -> Result<(), GraphError>;

    fn set_wetness(&mut self, reverb: NodeId, wetness: f32) -> Result<(), GraphError>;

    /// Begin emitting
    fn start(&mut self, oscillator: NodeId) -> Result<(), GraphError>;

    /// Stop emitting; the node stays allocated
    fn stop(&mut self, oscillator: NodeId) -> Result<(), GraphError>;

    /// Disconnect and free a node. Disposing an unknown node is a no-op.
    fn dispose(&mut self, node: NodeId);

    fn start_transport(&mut self) -> Result<(), GraphError>;

    fn stop_transport(&mut self);

    /// Hold back edits from the audio engine until the matching
    /// [`end_batch`](SignalGraph::end_batch). Batches may nest.
    fn begin_batch(&mut self) {}

    /// Publish every edit made since the outermost `begin_batch` at once
    fn end_batch(&mut self) -> Result<(), GraphError> {
        Ok(())
    }
}

/// Convert decibels to linear amplitude
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_gain() {
        assert!((db_to_gain(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_gain(-20.0) - 0.1).abs() < 1e-6);
        assert!((db_to_gain(-6.0) - 0.501).abs() < 1e-3);
    }
}

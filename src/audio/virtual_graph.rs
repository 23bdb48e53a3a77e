//! In-memory signal graph: tracks nodes and routing without producing sound.
//!
//! Backs `--mute` and serves as the inspectable graph in tests. A node
//! capacity can be set to simulate provider resource exhaustion.

use std::collections::BTreeMap;

use super::{NodeId, SignalGraph};
use crate::error::GraphError;

/// Observable state of one oscillator node
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualOscillator {
    pub frequency_hz: f32,
    pub volume_db: f32,
    pub running: bool,
    pub reverb: Option<NodeId>,
}

/// Observable state of one reverb node
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualReverb {
    pub decay_s: f32,
    pub wetness: f32,
    pub to_output: bool,
}

/// Signal graph that only records what would be audible
#[derive(Debug, Clone, Default)]
pub struct VirtualGraph {
    oscillators: BTreeMap<NodeId, VirtualOscillator>,
    reverbs: BTreeMap<NodeId, VirtualReverb>,
    transport_running: bool,
    capacity: Option<usize>,
    next_id: u32,
}

impl VirtualGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Graph that refuses to hold more than `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn oscillators(&self) -> impl Iterator<Item = (NodeId, &VirtualOscillator)> {
        self.oscillators.iter().map(|(id, osc)| (*id, osc))
    }

    pub fn oscillator(&self, id: NodeId) -> Option<&VirtualOscillator> {
        self.oscillators.get(&id)
    }

    pub fn reverbs(&self) -> impl Iterator<Item = (NodeId, &VirtualReverb)> {
        self.reverbs.iter().map(|(id, reverb)| (*id, reverb))
    }

    pub fn reverb(&self, id: NodeId) -> Option<&VirtualReverb> {
        self.reverbs.get(&id)
    }

    pub fn live_nodes(&self) -> usize {
        self.oscillators.len() + self.reverbs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live_nodes() == 0
    }

    pub fn transport_running(&self) -> bool {
        self.transport_running
    }

    /// Oscillators that are running, routed to a reverb that reaches the output
    pub fn audible_oscillators(&self) -> usize {
        if !self.transport_running {
            return 0;
        }
        self.oscillators
            .values()
            .filter(|osc| osc.running)
            .filter(|osc| {
                osc.reverb
                    .and_then(|id| self.reverbs.get(&id))
                    .is_some_and(|reverb| reverb.to_output)
            })
            .count()
    }

    fn allocate(&mut self) -> Result<NodeId, GraphError> {
        let live = self.live_nodes();
        if let Some(capacity) = self.capacity {
            if live >= capacity {
                return Err(GraphError::Exhausted { live, capacity });
            }
        }
        let id = NodeId(self.next_id);
        self.next_id += 1;
        Ok(id)
    }

    fn oscillator_mut(&mut self, id: NodeId) -> Result<&mut VirtualOscillator, GraphError> {
        self.oscillators
            .get_mut(&id)
            .ok_or(GraphError::UnknownNode(id))
    }
}

impl SignalGraph for VirtualGraph {
    fn create_oscillator(
        &mut self,
        frequency_hz: f32,
        volume_db: f32,
    ) -> Result<NodeId, GraphError> {
        let id = self.allocate()?;
        self.oscillators.insert(
            id,
            VirtualOscillator {
                frequency_hz,
                volume_db,
                running: false,
                reverb: None,
            },
        );
        Ok(id)
    }

    fn create_reverb(&mut self, decay_s: f32, wetness: f32) -> Result<NodeId, GraphError> {
        let id = self.allocate()?;
        self.reverbs.insert(
            id,
            VirtualReverb {
                decay_s,
                wetness,
                to_output: false,
            },
        );
        Ok(id)
    }

    fn connect(&mut self, oscillator: NodeId, reverb: NodeId) -> Result<(), GraphError> {
        if !self.reverbs.contains_key(&reverb) {
            return Err(GraphError::UnknownNode(reverb));
        }
        self.oscillator_mut(oscillator)?.reverb = Some(reverb);
        Ok(())
    }

    fn connect_to_output(&mut self, reverb: NodeId) -> Result<(), GraphError> {
        let node = self
            .reverbs
            .get_mut(&reverb)
            .ok_or(GraphError::UnknownNode(reverb))?;
        node.to_output = true;
        Ok(())
    }

    fn set_frequency(&mut self, oscillator: NodeId, frequency_hz: f32) -> Result<(), GraphError> {
        self.oscillator_mut(oscillator)?.frequency_hz = frequency_hz;
        Ok(())
    }

    fn set_volume(&mut self, oscillator: NodeId, volume_db: f32) -> Result<(), GraphError> {
        self.oscillator_mut(oscillator)?.volume_db = volume_db;
        Ok(())
    }

    fn set_wetness(&mut self, reverb: NodeId, wetness: f32) -> Result<(), GraphError> {
        let node = self
            .reverbs
            .get_mut(&reverb)
            .ok_or(GraphError::UnknownNode(reverb))?;
        node.wetness = wetness;
        Ok(())
    }

    fn start(&mut self, oscillator: NodeId) -> Result<(), GraphError> {
        self.oscillator_mut(oscillator)?.running = true;
        Ok(())
    }

    fn stop(&mut self, oscillator: NodeId) -> Result<(), GraphError> {
        self.oscillator_mut(oscillator)?.running = false;
        Ok(())
    }

    fn dispose(&mut self, node: NodeId) {
        if self.oscillators.remove(&node).is_some() {
            return;
        }
        if self.reverbs.remove(&node).is_some() {
            // Anything still routed into the reverb is now disconnected
            for osc in self.oscillators.values_mut() {
                if osc.reverb == Some(node) {
                    osc.reverb = None;
                }
            }
        }
    }

    fn start_transport(&mut self) -> Result<(), GraphError> {
        self.transport_running = true;
        Ok(())
    }

    fn stop_transport(&mut self) {
        self.transport_running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_and_audibility() {
        let mut graph = VirtualGraph::new();
        let reverb = graph.create_reverb(10.0, 0.2).unwrap();
        let osc = graph.create_oscillator(220.0, -12.0).unwrap();
        graph.connect(osc, reverb).unwrap();
        graph.start(osc).unwrap();
        assert_eq!(graph.audible_oscillators(), 0);

        graph.connect_to_output(reverb).unwrap();
        graph.start_transport().unwrap();
        assert_eq!(graph.audible_oscillators(), 1);
    }

    #[test]
    fn test_capacity_exhaustion() {
        let mut graph = VirtualGraph::with_capacity(2);
        graph.create_reverb(1.0, 0.5).unwrap();
        graph.create_oscillator(220.0, 0.0).unwrap();
        assert_eq!(
            graph.create_oscillator(330.0, 0.0),
            Err(GraphError::Exhausted {
                live: 2,
                capacity: 2
            })
        );
    }

    #[test]
    fn test_dispose_reverb_disconnects_sources() {
        let mut graph = VirtualGraph::new();
        let reverb = graph.create_reverb(1.0, 0.5).unwrap();
        let osc = graph.create_oscillator(220.0, 0.0).unwrap();
        graph.connect(osc, reverb).unwrap();

        graph.dispose(reverb);
        graph.dispose(reverb);
        assert_eq!(graph.oscillator(osc).unwrap().reverb, None);
        assert_eq!(graph.live_nodes(), 1);
    }

    #[test]
    fn test_unknown_node_errors() {
        let mut graph = VirtualGraph::new();
        let osc = graph.create_oscillator(220.0, 0.0).unwrap();
        assert_eq!(
            graph.connect(osc, NodeId(99)),
            Err(GraphError::UnknownNode(NodeId(99)))
        );
        assert!(graph.set_wetness(osc, 0.3).is_err());
    }
}

//! Signal graph controller: owns node lifecycles and mirrors the parameter
//! store into whatever graph provider it drives.

use log::{debug, warn};

use super::{NodeId, SignalGraph};
use crate::error::GraphError;
use crate::params::GraphLifecycle;
use crate::store::ParameterSet;

/// Reverb node plus the decay it was constructed with
#[derive(Debug, Clone, Copy)]
struct LiveReverb {
    id: NodeId,
    decay_s: f32,
}

/// Translates parameter store values into signal graph operations
pub struct GraphController<G: SignalGraph> {
    graph: G,
    lifecycle: GraphLifecycle,
    max_wetness: f32,
    oscillators: Vec<NodeId>,
    reverb: Option<LiveReverb>,
}

impl<G: SignalGraph> GraphController<G> {
    /// Create a controller with an empty graph; nodes are built on first start
    pub fn new(graph: G, lifecycle: GraphLifecycle, max_wetness: f32) -> Self {
        Self {
            graph,
            lifecycle,
            max_wetness,
            oscillators: Vec::new(),
            reverb: None,
        }
    }

    pub fn graph(&self) -> &G {
        &self.graph
    }

    /// Oscillator nodes currently owned, in parameter order
    pub fn oscillator_nodes(&self) -> &[NodeId] {
        &self.oscillators
    }

    pub fn reverb_node(&self) -> Option<NodeId> {
        self.reverb.map(|reverb| reverb.id)
    }

    /// Start sound. No-op while already playing.
    ///
    /// On failure every node built by this call is released and
    /// `is_playing` stays false.
    pub fn start(&mut self, params: &mut ParameterSet) -> Result<(), GraphError> {
        if params.is_playing() {
            return Ok(());
        }

        if let Err(e) = self.batched(|controller| controller.try_start(params)) {
            warn!("Start failed, releasing graph: {}", e);
            self.release();
            return Err(e);
        }

        params.set_playing(true);
        debug!(
            "Started {} oscillators ({:?})",
            self.oscillators.len(),
            self.lifecycle
        );
        Ok(())
    }

    fn try_start(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        match self.lifecycle {
            GraphLifecycle::Persistent => {
                if self.oscillators.len() != params.oscillator_count() || self.reverb.is_none() {
                    self.teardown();
                    self.build(params)?;
                } else {
                    // Pick up edits made while stopped
                    self.push_parameters(params)?;
                }
            }
            GraphLifecycle::Rebuild => {
                self.teardown();
                self.build(params)?;
            }
        }

        self.start_oscillators()?;
        self.graph.start_transport()
    }

    /// Stop sound. No-op while stopped; never fails.
    ///
    /// Persistent graphs keep their oscillators allocated but silent,
    /// rebuild graphs are released entirely.
    pub fn stop(&mut self, params: &mut ParameterSet) {
        if !params.is_playing() {
            return;
        }

        self.graph.begin_batch();
        match self.lifecycle {
            GraphLifecycle::Persistent => {
                for &osc in &self.oscillators {
                    if let Err(e) = self.graph.stop(osc) {
                        warn!("Failed to stop oscillator {:?}: {}", osc, e);
                    }
                }
            }
            GraphLifecycle::Rebuild => self.teardown(),
        }
        self.graph.stop_transport();
        if let Err(e) = self.graph.end_batch() {
            warn!("Audio program update on stop failed: {}", e);
        }

        params.set_playing(false);
        debug!("Stopped ({:?})", self.lifecycle);
    }

    /// Push frequencies, volume, wetness and decay into the live graph.
    ///
    /// A decay change swaps in a new reverb: the new node is connected
    /// before the old one is released, so sound is never interrupted.
    pub fn apply_parameters(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        self.batched(|controller| controller.push_parameters(params))
    }

    fn push_parameters(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        let volume_db = params.voice_volume_db();
        for (&osc, &frequency_hz) in self.oscillators.iter().zip(params.frequencies()) {
            self.graph.set_frequency(osc, frequency_hz)?;
            self.graph.set_volume(osc, volume_db)?;
        }

        let Some(reverb) = self.reverb else {
            return Ok(());
        };

        if reverb.decay_s != params.reverb_decay_s() {
            self.swap_reverb(params)?;
        } else {
            let wetness = self.normalized_wetness(params);
            self.graph.set_wetness(reverb.id, wetness)?;
        }
        Ok(())
    }

    /// Rebuild the node set at `params.oscillator_count()`.
    ///
    /// A playing graph is restarted immediately. If the rebuild fails the
    /// graph is left empty and the instrument stops.
    pub fn set_oscillator_count(&mut self, params: &mut ParameterSet) -> Result<(), GraphError> {
        let playing = params.is_playing();
        let count = params.oscillator_count();

        if let Err(e) = self.batched(|controller| controller.rebuild(params, playing)) {
            warn!("Rebuild at {} oscillators failed: {}", count, e);
            self.release();
            params.set_playing(false);
            return Err(e);
        }

        debug!("Rebuilt graph with {} oscillators", self.oscillators.len());
        Ok(())
    }

    fn rebuild(&mut self, params: &ParameterSet, playing: bool) -> Result<(), GraphError> {
        let had_graph = self.reverb.is_some();
        self.teardown();

        if !playing && !(self.lifecycle == GraphLifecycle::Persistent && had_graph) {
            return Ok(());
        }

        self.build(params)?;
        if playing {
            self.start_oscillators()?;
        }
        Ok(())
    }

    /// Release every node and stop the transport. Safe to call repeatedly.
    pub fn dispose(&mut self, params: &mut ParameterSet) {
        self.release();
        params.set_playing(false);
    }

    /// Run `op` so the provider publishes its edits as one update
    fn batched<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, GraphError>,
    ) -> Result<T, GraphError> {
        self.graph.begin_batch();
        let result = op(self);
        let published = self.graph.end_batch();
        let value = result?;
        published?;
        Ok(value)
    }

    /// Tear down and stop the transport in one update
    fn release(&mut self) {
        self.graph.begin_batch();
        self.teardown();
        self.graph.stop_transport();
        if let Err(e) = self.graph.end_batch() {
            warn!("Audio program update on release failed: {}", e);
        }
    }

    /// Build a fresh reverb and one oscillator per frequency, fully wired.
    /// Rolls back everything it created on failure.
    fn build(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        debug_assert!(self.oscillators.is_empty() && self.reverb.is_none());

        let result = self.try_build(params);
        if result.is_err() {
            self.teardown();
        }
        result
    }

    fn try_build(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        let decay_s = params.reverb_decay_s();
        let wetness = self.normalized_wetness(params);
        let id = self.graph.create_reverb(decay_s, wetness)?;
        self.reverb = Some(LiveReverb { id, decay_s });
        self.graph.connect_to_output(id)?;

        let volume_db = params.voice_volume_db();
        for &frequency_hz in params.frequencies() {
            let osc = self.graph.create_oscillator(frequency_hz, volume_db)?;
            self.oscillators.push(osc);
            self.graph.connect(osc, id)?;
        }
        Ok(())
    }

    fn swap_reverb(&mut self, params: &ParameterSet) -> Result<(), GraphError> {
        let Some(old) = self.reverb else {
            return Ok(());
        };

        let decay_s = params.reverb_decay_s();
        let wetness = self.normalized_wetness(params);
        let new_id = self.graph.create_reverb(decay_s, wetness)?;

        if let Err(e) = self.route_all(new_id) {
            // Put every oscillator back on the old reverb
            for &osc in &self.oscillators {
                if let Err(e) = self.graph.connect(osc, old.id) {
                    warn!("Failed to restore route for {:?}: {}", osc, e);
                }
            }
            self.graph.dispose(new_id);
            return Err(e);
        }

        self.graph.dispose(old.id);
        self.reverb = Some(LiveReverb { id: new_id, decay_s });
        debug!("Reverb rebuilt with {:.1}s decay", decay_s);
        Ok(())
    }

    /// Connect `reverb` to the output and move every oscillator onto it
    fn route_all(&mut self, reverb: NodeId) -> Result<(), GraphError> {
        self.graph.connect_to_output(reverb)?;
        for &osc in &self.oscillators {
            self.graph.connect(osc, reverb)?;
        }
        Ok(())
    }

    fn start_oscillators(&mut self) -> Result<(), GraphError> {
        for &osc in &self.oscillators {
            self.graph.start(osc)?;
        }
        Ok(())
    }

    fn teardown(&mut self) {
        for osc in self.oscillators.drain(..) {
            if let Err(e) = self.graph.stop(osc) {
                debug!("Stop during teardown of {:?}: {}", osc, e);
            }
            self.graph.dispose(osc);
        }
        if let Some(reverb) = self.reverb.take() {
            self.graph.dispose(reverb.id);
        }
    }

    fn normalized_wetness(&self, params: &ParameterSet) -> f32 {
        if self.max_wetness <= 0.0 {
            return 0.0;
        }
        (params.reverb_wetness() / self.max_wetness).clamp(0.0, 1.0)
    }
}

impl<G: SignalGraph> Drop for GraphController<G> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VirtualGraph;
    use crate::params::InstrumentConfig;

    fn circles() -> (GraphController<VirtualGraph>, ParameterSet) {
        let config = InstrumentConfig::circles();
        let params = ParameterSet::new(&config);
        let controller = GraphController::new(
            VirtualGraph::new(),
            config.lifecycle,
            config.max_reverb_wetness,
        );
        (controller, params)
    }

    fn lissajous() -> (GraphController<VirtualGraph>, ParameterSet) {
        let config = InstrumentConfig::lissajous();
        let params = ParameterSet::new(&config);
        let controller = GraphController::new(
            VirtualGraph::new(),
            config.lifecycle,
            config.max_reverb_wetness,
        );
        (controller, params)
    }

    /// Provider that counts how often edits would reach an audio engine
    #[derive(Default)]
    struct PublishCounter {
        nodes: VirtualGraph,
        depth: usize,
        unbatched_edits: usize,
        publishes: usize,
    }

    impl PublishCounter {
        fn edit<T>(&mut self, edit: impl FnOnce(&mut VirtualGraph) -> T) -> T {
            if self.depth == 0 {
                self.unbatched_edits += 1;
            }
            edit(&mut self.nodes)
        }
    }

    impl SignalGraph for PublishCounter {
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

        fn set_frequency(&mut self, oscillator: NodeId, hz: f32) -> Result<(), GraphError> {
            self.edit(|nodes| nodes.set_frequency(oscillator, hz))
        }

        fn set_volume(&mut self, oscillator: NodeId, db: f32) -> Result<(), GraphError> {
            self.edit(|nodes| nodes.set_volume(oscillator, db))
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
            self.edit(|nodes| nodes.dispose(node))
        }

        fn start_transport(&mut self) -> Result<(), GraphError> {
            self.edit(|nodes| nodes.start_transport())
        }

        fn stop_transport(&mut self) {
            self.edit(|nodes| nodes.stop_transport())
        }

        fn begin_batch(&mut self) {
            self.depth += 1;
        }

        fn end_batch(&mut self) -> Result<(), GraphError> {
            self.depth -= 1;
            if self.depth == 0 {
                self.publishes += 1;
            }
            Ok(())
        }
    }

    fn assert_fully_wired(controller: &GraphController<VirtualGraph>, count: usize) {
        let graph = controller.graph();
        let reverb = controller.reverb_node().expect("reverb missing");
        assert_eq!(graph.oscillators().count(), count);
        assert_eq!(graph.reverbs().count(), 1);
        assert!(graph.reverb(reverb).unwrap().to_output);
        for (_, osc) in graph.oscillators() {
            assert_eq!(osc.reverb, Some(reverb));
        }
    }

    #[test]
    fn test_graph_is_lazy() {
        let (controller, _) = circles();
        assert!(controller.graph().is_empty());
    }

    #[test]
    fn test_start_wires_every_oscillator() {
        for count in 1..=8 {
            let (mut controller, mut params) = lissajous();
            params.set_oscillator_count(count);
            controller.start(&mut params).unwrap();

            assert!(params.is_playing());
            assert_fully_wired(&controller, count);
            assert_eq!(controller.graph().audible_oscillators(), count);
        }
    }

    #[test]
    fn test_start_while_playing_keeps_nodes() {
        let (mut controller, mut params) = lissajous();
        controller.start(&mut params).unwrap();
        let nodes = controller.oscillator_nodes().to_vec();
        let reverb = controller.reverb_node();

        controller.start(&mut params).unwrap();
        assert_eq!(controller.oscillator_nodes(), nodes.as_slice());
        assert_eq!(controller.reverb_node(), reverb);
    }

    #[test]
    fn test_double_stop_is_noop() {
        let (mut controller, mut params) = circles();
        controller.stop(&mut params);
        assert!(controller.graph().is_empty());

        controller.start(&mut params).unwrap();
        controller.stop(&mut params);
        let live = controller.graph().live_nodes();
        controller.stop(&mut params);
        assert_eq!(controller.graph().live_nodes(), live);
        assert!(!params.is_playing());
        assert!(!controller.graph().transport_running());
    }

    #[test]
    fn test_persistent_stop_keeps_oscillators() {
        let (mut controller, mut params) = circles();
        controller.start(&mut params).unwrap();
        let nodes = controller.oscillator_nodes().to_vec();

        controller.stop(&mut params);
        assert_eq!(controller.graph().oscillators().count(), 2);
        assert!(controller.graph().oscillators().all(|(_, osc)| !osc.running));

        controller.start(&mut params).unwrap();
        assert_eq!(controller.oscillator_nodes(), nodes.as_slice());
    }

    #[test]
    fn test_rebuild_stop_releases_everything() {
        let (mut controller, mut params) = lissajous();
        controller.start(&mut params).unwrap();
        controller.stop(&mut params);
        assert!(controller.graph().is_empty());
        assert!(controller.oscillator_nodes().is_empty());
    }

    #[test]
    fn test_restart_resumes_frequencies_and_wetness() {
        let (mut controller, mut params) = circles();
        params.set_reverb_wetness(2.5);
        controller.start(&mut params).unwrap();
        controller.apply_parameters(&params).unwrap();
        controller.stop(&mut params);
        controller.start(&mut params).unwrap();

        let graph = controller.graph();
        let freqs: Vec<f32> = graph.oscillators().map(|(_, o)| o.frequency_hz).collect();
        assert_eq!(freqs, vec![220.0, 330.0]);
        assert_eq!(graph.audible_oscillators(), 2);
        let reverb = graph.reverb(controller.reverb_node().unwrap()).unwrap();
        assert!((reverb.wetness - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_start_failure_leaves_graph_empty() {
        let config = InstrumentConfig::lissajous();
        let mut params = ParameterSet::new(&config);
        // Room for the reverb and two of the three oscillators
        let mut controller = GraphController::new(
            VirtualGraph::with_capacity(3),
            config.lifecycle,
            config.max_reverb_wetness,
        );

        let result = controller.start(&mut params);
        assert!(matches!(result, Err(GraphError::Exhausted { .. })));
        assert!(!params.is_playing());
        assert!(controller.graph().is_empty());
        assert!(!controller.graph().transport_running());
    }

    #[test]
    fn test_decay_change_swaps_reverb_without_gap() {
        let (mut controller, mut params) = circles();
        controller.start(&mut params).unwrap();
        let old = controller.reverb_node().unwrap();

        params.set_reverb_decay_s(3.0);
        controller.apply_parameters(&params).unwrap();

        let new = controller.reverb_node().unwrap();
        assert_ne!(old, new);
        assert!(controller.graph().reverb(old).is_none());
        assert_eq!(controller.graph().reverb(new).unwrap().decay_s, 3.0);
        assert_fully_wired(&controller, 2);
        assert_eq!(controller.graph().audible_oscillators(), 2);
    }

    #[test]
    fn test_failed_decay_swap_keeps_old_reverb() {
        let config = InstrumentConfig::circles();
        let mut params = ParameterSet::new(&config);
        let mut controller = GraphController::new(
            VirtualGraph::with_capacity(3),
            config.lifecycle,
            config.max_reverb_wetness,
        );
        controller.start(&mut params).unwrap();
        let old = controller.reverb_node();

        params.set_reverb_decay_s(1.0);
        assert!(controller.apply_parameters(&params).is_err());
        assert_eq!(controller.reverb_node(), old);
        assert_fully_wired(&controller, 2);
        assert_eq!(controller.graph().audible_oscillators(), 2);
    }

    #[test]
    fn test_wetness_updates_in_place() {
        let (mut controller, mut params) = circles();
        controller.start(&mut params).unwrap();
        let reverb = controller.reverb_node();

        params.set_reverb_wetness(5.0);
        controller.apply_parameters(&params).unwrap();
        assert_eq!(controller.reverb_node(), reverb);
        let node = controller.graph().reverb(reverb.unwrap()).unwrap();
        assert_eq!(node.wetness, 1.0);
    }

    #[test]
    fn test_count_change_while_playing_restarts() {
        let (mut controller, mut params) = lissajous();
        params.set_oscillator_count(2);
        controller.start(&mut params).unwrap();

        params.set_oscillator_count(4);
        controller.set_oscillator_count(&mut params).unwrap();

        assert!(params.is_playing());
        assert_fully_wired(&controller, 4);
        assert_eq!(controller.graph().audible_oscillators(), 4);
    }

    #[test]
    fn test_count_change_while_stopped_builds_nothing() {
        let (mut controller, mut params) = lissajous();
        params.set_oscillator_count(5);
        controller.set_oscillator_count(&mut params).unwrap();
        assert!(controller.graph().is_empty());
    }

    #[test]
    fn test_failed_rebuild_stops_instrument() {
        let config = InstrumentConfig::lissajous();
        let mut params = ParameterSet::new(&config);
        let mut controller = GraphController::new(
            VirtualGraph::with_capacity(4),
            config.lifecycle,
            config.max_reverb_wetness,
        );
        controller.start(&mut params).unwrap();

        params.set_oscillator_count(6);
        assert!(controller.set_oscillator_count(&mut params).is_err());
        assert!(!params.is_playing());
        assert!(controller.graph().is_empty());
        assert!(!controller.graph().transport_running());
    }

    #[test]
    fn test_voice_volume_reaches_graph() {
        let (mut controller, mut params) = lissajous();
        params.set_volume_db(-15.0);
        params.set_oscillator_count(3);
        controller.start(&mut params).unwrap();

        let expected = -15.0 - 3.0 * 3.0_f32.log2();
        for (_, osc) in controller.graph().oscillators() {
            assert!((osc.volume_db - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut controller, mut params) = circles();
        controller.start(&mut params).unwrap();
        controller.dispose(&mut params);
        controller.dispose(&mut params);
        assert!(controller.graph().is_empty());
        assert!(!params.is_playing());
    }

    #[test]
    fn test_each_operation_publishes_once() {
        let config = InstrumentConfig::lissajous();
        let mut params = ParameterSet::new(&config);
        params.set_oscillator_count(8);
        let mut controller = GraphController::new(
            PublishCounter::default(),
            config.lifecycle,
            config.max_reverb_wetness,
        );

        controller.start(&mut params).unwrap();
        assert_eq!(controller.graph().publishes, 1);

        params.set_frequency(3, 500.0);
        params.set_reverb_decay_s(4.0);
        controller.apply_parameters(&params).unwrap();
        assert_eq!(controller.graph().publishes, 2);

        params.set_oscillator_count(5);
        controller.set_oscillator_count(&mut params).unwrap();
        assert_eq!(controller.graph().nodes.audible_oscillators(), 5);

        controller.stop(&mut params);
        controller.dispose(&mut params);

        let graph = controller.graph();
        assert_eq!(graph.publishes, 5);
        assert_eq!(graph.unbatched_edits, 0);
        assert_eq!(graph.depth, 0);
        assert!(graph.nodes.is_empty());
    }
}

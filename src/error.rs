//! Error types for the signal graph and the control surface.

use thiserror::Error;

use crate::audio::NodeId;

/// Failures reported by a signal graph provider
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Node allocation failed: {live} live nodes, capacity {capacity}")]
    Exhausted { live: usize, capacity: usize },

    #[error("Unknown node {0:?}")]
    UnknownNode(NodeId),

    #[error("Audio engine rejected program: {0}")]
    Engine(String),

    #[error("Audio device error: {0}")]
    Device(String),
}

/// Failures reported by the control surface
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    #[error("Oscillator {index} does not exist ({count} active)")]
    NoSuchOscillator { index: usize, count: usize },

    #[error("Invalid value for {field}: {value}")]
    InvalidInput { field: &'static str, value: f32 },

    #[error("Signal graph error: {0}")]
    Graph(#[from] GraphError),
}

//! Oscillscope library - oscillators and reverb that drive a synchronized
//! animation

pub mod audio;
pub mod cli;
pub mod error;
pub mod instrument;
pub mod params;
pub mod rendering;
pub mod store;
pub mod visual;

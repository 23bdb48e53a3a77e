//! Parameter definitions with physical units and documented semantics.
//!
//! All magic numbers are extracted here with:
//! - Physical units (Hz, decibels, seconds, pixels)
//! - Documented ranges and meanings
//! - Type safety where possible

mod audio;
mod instrument;
mod render;
mod visual;

// Re-export all types
pub use audio::audio_constants;
pub use instrument::{FrequencyLayout, GraphLifecycle, InstrumentConfig, InstrumentKind};
pub use render::{RecordingConfig, RenderConfig};
pub use visual::{CircleLayout, LissajousLayout, VisualMapping};

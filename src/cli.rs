//! Command-line argument parsing.

use clap::Parser;
use log::warn;

use crate::params::{InstrumentConfig, InstrumentKind, RecordingConfig, RenderConfig};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "Oscillscope")]
#[command(about = "Oscillators and reverb with a synchronized visualization", long_about = None)]
pub struct Args {
    /// Instrument: circles (default) or lissajous
    #[arg(long, value_name = "INSTRUMENT", default_value = "circles")]
    pub instrument: String,

    /// Run without an audio device (graph is tracked but silent)
    #[arg(long)]
    pub mute: bool,

    /// Record frames to PNG (duration in seconds)
    #[arg(long, value_name = "SECONDS")]
    pub record: Option<f32>,

    /// Window width (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "1280")]
    pub width: u32,

    /// Window height (pixels)
    #[arg(long, value_name = "PIXELS", default_value = "720")]
    pub height: u32,
}

impl Args {
    /// Parse instrument kind from command-line arguments
    pub fn parse_instrument(&self) -> InstrumentKind {
        match self.instrument.to_lowercase().as_str() {
            "circles" | "a" => InstrumentKind::Circles,
            "lissajous" | "b" => InstrumentKind::Lissajous,
            other => {
                warn!("Unknown instrument '{}', using circles", other);
                InstrumentKind::Circles
            }
        }
    }

    pub fn instrument_config(&self) -> InstrumentConfig {
        InstrumentConfig::for_kind(self.parse_instrument())
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            window_width: self.width,
            window_height: self.height,
            ..RenderConfig::default()
        }
    }

    /// Create recording configuration if recording mode is enabled
    pub fn create_recording_config(&self) -> std::io::Result<Option<RecordingConfig>> {
        let Some(duration) = self.record else {
            return Ok(None);
        };
        let config = RecordingConfig::new(duration);

        // Create output directories
        std::fs::create_dir_all(config.frames_dir())?;
        Ok(Some(config))
    }
}

//! Oscillscope - oscillators, reverb and a visualization that moves with them
//!
//! Keys: Space start/stop, Up/Down and Right/Left tune the first two
//! oscillators, =/- oscillator count, W/Q wetness, D/S decay, ]/[ volume.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use winit::{
    application::ApplicationHandler,
    event::*,
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use oscillscope::audio::{GlicolGraph, SignalGraph, VirtualGraph};
use oscillscope::cli::Args;
use oscillscope::error::InstrumentError;
use oscillscope::instrument::VisualInstrument;
use oscillscope::params::{RecordingConfig, RenderConfig};
use oscillscope::rendering::RenderSystem;
use oscillscope::visual::{Color, DrawList};

/// Frequency change per key press (Hz)
const FREQUENCY_STEP_HZ: f32 = 10.0;
/// Wetness change per key press
const WETNESS_STEP: f32 = 0.25;
/// Decay change per key press (seconds)
const DECAY_STEP_S: f32 = 1.0;
/// Volume change per key press (dB)
const VOLUME_STEP_DB: f32 = 1.0;

/// Main application state
struct App<G: SignalGraph> {
    // Window and rendering
    window: Option<Arc<Window>>,
    render_system: Option<RenderSystem>,
    draw_list: DrawList,

    instrument: VisualInstrument<G>,

    // Configuration
    render_config: RenderConfig,
    recording_config: Option<RecordingConfig>,

    frame_num: usize,
}

impl<G: SignalGraph> App<G> {
    fn new(
        instrument: VisualInstrument<G>,
        render_config: RenderConfig,
        recording_config: Option<RecordingConfig>,
    ) -> Self {
        let draw_list = DrawList::new(
            render_config.window_width as f32,
            render_config.window_height as f32,
        );
        Self {
            window: None,
            render_system: None,
            draw_list,
            instrument,
            render_config,
            recording_config,
            frame_num: 0,
        }
    }

    /// Render a single frame
    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        if !self.tick() {
            event_loop.exit();
        }
    }

    /// Advance the animation one frame and draw it if a renderer exists.
    /// Returns false once the app should exit.
    fn tick(&mut self) -> bool {
        // The animation runs even without a renderer so motion stays in step
        self.instrument.frame(&mut self.draw_list);

        if let Some(ref mut render_system) = self.render_system {
            match render_system.render(&self.draw_list, self.frame_num) {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    let (width, height) = render_system.size();
                    render_system.resize(width, height);
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("GPU out of memory, exiting");
                    return false;
                }
                Err(e) => warn!("Render error: {:?}", e),
            }
        }

        // Counted with or without a renderer so recording always ends
        self.frame_num += 1;
        if let Some(ref config) = self.recording_config {
            if self.frame_num >= config.total_frames() {
                info!("Recorded {} frames to {}", self.frame_num, config.frames_dir());
                return false;
            }
        }
        true
    }

    fn handle_key(&mut self, code: KeyCode) {
        let params = self.instrument.params();
        let first_hz = params.frequency(0).unwrap_or_default();
        let second_hz = params.frequency(1).unwrap_or_default();
        let count = params.oscillator_count();
        let wetness = params.reverb_wetness();
        let decay_s = params.reverb_decay_s();
        let volume_db = params.volume_db();

        let result = match code {
            KeyCode::Space => self.instrument.toggle().map(|playing| {
                info!("{}", if playing { "Playing" } else { "Stopped" });
            }),
            KeyCode::ArrowUp => self
                .instrument
                .set_frequency(0, first_hz + FREQUENCY_STEP_HZ),
            KeyCode::ArrowDown => self
                .instrument
                .set_frequency(0, first_hz - FREQUENCY_STEP_HZ),
            KeyCode::ArrowRight => self
                .instrument
                .set_frequency(1, second_hz + FREQUENCY_STEP_HZ),
            KeyCode::ArrowLeft => self
                .instrument
                .set_frequency(1, second_hz - FREQUENCY_STEP_HZ),
            KeyCode::Equal => self.instrument.set_oscillator_count(count + 1),
            KeyCode::Minus => self
                .instrument
                .set_oscillator_count(count.saturating_sub(1)),
            KeyCode::KeyW => self.instrument.set_reverb_wetness(wetness + WETNESS_STEP),
            KeyCode::KeyQ => self.instrument.set_reverb_wetness(wetness - WETNESS_STEP),
            KeyCode::KeyD => self.instrument.set_reverb_decay(decay_s + DECAY_STEP_S),
            KeyCode::KeyS => self.instrument.set_reverb_decay(decay_s - DECAY_STEP_S),
            KeyCode::BracketRight => self.instrument.set_volume_db(volume_db + VOLUME_STEP_DB),
            KeyCode::BracketLeft => self.instrument.set_volume_db(volume_db - VOLUME_STEP_DB),
            _ => Ok(()),
        };

        match result {
            Ok(()) => {}
            Err(InstrumentError::Graph(e)) => {
                error!("Audio: {} (playing: {})", e, self.instrument.is_playing());
            }
            Err(e) => warn!("{}", e),
        }
    }
}

impl<G: SignalGraph> ApplicationHandler for App<G> {
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return; // Already initialized
        }

        // Create window
        let window_attributes = Window::default_attributes()
            .with_title("Oscillscope")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.render_config.window_width,
                self.render_config.window_height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let size = window.inner_size();
        self.draw_list.resize(size.width as f32, size.height as f32);

        // Visuals are optional: audio keeps working without a GPU
        match pollster::block_on(RenderSystem::new(
            Arc::clone(&window),
            &self.render_config,
            self.recording_config.clone(),
        )) {
            Ok(render_system) => self.render_system = Some(render_system),
            Err(e) => error!("Renderer unavailable, continuing audio-only: {}", e),
        }

        if self.recording_config.is_some() {
            if let Err(e) = self.instrument.start() {
                error!("Failed to start playback for recording: {}", e);
            }
        }

        info!("Oscillscope is running! Space to play, ESC to quit");

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        ..
                    },
                ..
            } => event_loop.exit(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        state: ElementState::Pressed,
                        physical_key: PhysicalKey::Code(code),
                        repeat: false,
                        ..
                    },
                ..
            } => self.handle_key(code),
            WindowEvent::Resized(physical_size) => {
                self.draw_list
                    .resize(physical_size.width as f32, physical_size.height as f32);
                if let Some(render_system) = &mut self.render_system {
                    render_system.resize(physical_size.width, physical_size.height);
                }
            }
            WindowEvent::RedrawRequested => {
                self.render_frame(event_loop);
            }
            _ => {}
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.instrument.dispose();
    }
}

fn run<G: SignalGraph>(event_loop: EventLoop<()>, mut app: App<G>) -> anyhow::Result<()> {
    event_loop.run_app(&mut app).context("Event loop failed")
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.instrument_config();
    config.validate().map_err(anyhow::Error::msg)?;
    let render_config = args.render_config();
    let recording_config = args
        .create_recording_config()
        .context("Failed to create recording directory")?;
    let background = Color::from_rgb8(render_config.background);

    info!("Oscillscope - {:?} instrument", config.kind);

    let event_loop = EventLoop::new().context("Failed to create event loop")?;

    if args.mute {
        let instrument = VisualInstrument::with_background(config, VirtualGraph::new(), background);
        return run(event_loop, App::new(instrument, render_config, recording_config));
    }

    match GlicolGraph::new() {
        Ok(graph) => {
            let instrument = VisualInstrument::with_background(config, graph, background);
            run(event_loop, App::new(instrument, render_config, recording_config))
        }
        Err(e) => {
            warn!("{}; running muted", e);
            let instrument =
                VisualInstrument::with_background(config, VirtualGraph::new(), background);
            run(event_loop, App::new(instrument, render_config, recording_config))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oscillscope::params::InstrumentConfig;

    fn headless_app(recording_config: Option<RecordingConfig>) -> App<VirtualGraph> {
        let instrument = VisualInstrument::new(InstrumentConfig::lissajous(), VirtualGraph::new());
        App::new(instrument, RenderConfig::default(), recording_config)
    }

    #[test]
    fn test_recording_ends_without_renderer() {
        let config = RecordingConfig::new(0.5);
        let total = config.total_frames();
        let mut app = headless_app(Some(config));
        assert!(app.render_system.is_none());

        let running_frames = std::iter::repeat_with(|| app.tick())
            .take(100)
            .take_while(|&running| running)
            .count();
        assert_eq!(running_frames + 1, total);
        assert_eq!(app.frame_num, total);
    }

    #[test]
    fn test_free_run_keeps_going() {
        let mut app = headless_app(None);
        assert!((0..10).all(|_| app.tick()));
        assert_eq!(app.frame_num, 10);
    }
}

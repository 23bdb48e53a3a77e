//! Audio engine constants.

/// Audio constants (compile-time, match Glicol engine setup)
pub mod audio_constants {
    /// Audio block size (samples per buffer)
    /// 128 samples = 2.9ms @ 44.1kHz
    pub const BLOCK_SIZE: usize = 128;

    /// Upper bound on live nodes (oscillators + reverbs) in one audio program
    pub const MAX_NODES: usize = 32;

    /// Hard output clip applied in the device callback (linear amplitude)
    pub const SAFETY_LIMIT: f32 = 0.5;

    /// Loudness compensation per doubling of the oscillator count (dB)
    pub const COMPENSATION_DB_PER_DOUBLING: f32 = 3.0;
}

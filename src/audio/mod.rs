// Audio module - the dynamics processing engine
//
// This module provides the real-time dynamics chain broken down into logical
// components:
// - types: configuration, settings snapshots and presets
// - params: atomic scalar parameter state shared with the control thread
// - meters: level/gain-reduction taps read by a UI thread
// - effects: the per-stage DSP (gate, compressor, lookahead limiter)
// - chain: the ordered processing chain driven by the audio callback
// - sink: virtual output sink capability (loopback and null backends)

pub mod chain;
pub mod effects;
pub mod meters;
pub mod params;
pub mod sink;
pub mod types;

// Re-export commonly used types for easier imports
pub use chain::DynamicsChain;
pub use effects::{Compressor, GainComputer, Limiter, LinearSmoother, NoiseGate};
pub use meters::{MeterState, PeakDetector};
pub use params::{AtomicF32, ChainParams};
pub use sink::{LoopbackSink, NullSink, OutputSink, SinkError};
pub use types::{
    ChainConfig, ChainProfile, ChainSettings, CompressorSettings, GateSettings, LimiterSettings,
    DEFAULT_BLOCK_SIZE, DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE,
};

pub mod audio;
pub mod log;

// Re-export the engine surface for easier imports
pub use audio::{
    ChainConfig, ChainProfile, ChainSettings, Compressor, CompressorSettings, DynamicsChain,
    GainComputer, GateSettings, Limiter, LimiterSettings, LinearSmoother, LoopbackSink,
    MeterState, NoiseGate, NullSink, OutputSink, SinkError, DEFAULT_BLOCK_SIZE,
    DEFAULT_SAMPLE_RATE,
};

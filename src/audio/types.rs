use serde::{Deserialize, Serialize};

/// Conservative fallback sample rate, used when a host processes a chain it
/// never prepared.
pub const DEFAULT_SAMPLE_RATE: f64 = 44_100.0;

/// Conservative fallback block size.
pub const DEFAULT_BLOCK_SIZE: usize = 512;

/// Default channel count the delay buffers are sized for.
pub const DEFAULT_CHANNELS: usize = 2;

/// Which stages the chain constructs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainProfile {
    /// Gate -> compressor -> lookahead limiter. Adds lookahead latency.
    Full,
    /// Gate -> compressor only. Zero added latency, no brick-wall stage.
    Lightweight,
}

/// Structural configuration. Everything here requires a `prepare` call to
/// take effect; nothing here may change while the audio thread is running.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub sample_rate: f64,
    pub block_size: usize,
    pub channels: usize,
    pub profile: ChainProfile,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
            channels: DEFAULT_CHANNELS,
            profile: ChainProfile::Full,
        }
    }
}

/// Noise gate tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GateSettings {
    pub threshold_db: f32, // Threshold in dB (-80 to 0)
    pub ratio: f32,        // Downward expansion ratio (1 to 50)
    pub attack_ms: f32,    // Detector attack in ms (0.1 to 100)
    pub release_ms: f32,   // Detector release in ms (1 to 1000)
}

impl Default for GateSettings {
    fn default() -> Self {
        Self {
            threshold_db: -60.0,
            ratio: 10.0,
            attack_ms: 1.0,
            release_ms: 100.0,
        }
    }
}

/// Compressor tunables.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CompressorSettings {
    pub threshold_db: f32, // Threshold in dB (-60 to 0)
    pub ratio: f32,        // Compression ratio (1 to 20)
    pub attack_ms: f32,    // Attack time in ms (0.1 to 100)
    pub release_ms: f32,   // Release time in ms (1 to 1000)
    pub knee_db: f32,      // Soft knee width in dB (0 to 20)
    pub makeup_db: f32,    // Makeup gain in dB (-20 to 20)
    pub auto_makeup: bool, // Derive makeup from threshold/ratio instead
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -18.0,
            ratio: 3.0,
            attack_ms: 1.0,
            release_ms: 30.0,
            knee_db: 2.0,
            makeup_db: 0.0,
            auto_makeup: false,
        }
    }
}

/// Limiter tunables. Lookahead is structural and only picked up by `prepare`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LimiterSettings {
    pub ceiling_db: f32,   // Output ceiling in dB (-20 to 0)
    pub lookahead_ms: f32, // Lookahead in ms (0.1 to 10)
    pub release_ms: f32,   // Gain recovery time in ms (1 to 1000)
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            ceiling_db: -1.0,
            lookahead_ms: 3.0,
            release_ms: 300.0,
        }
    }
}

/// A complete parameter snapshot for the chain.
///
/// Plain values; the lock-free view the audio thread reads lives in
/// [`crate::audio::params::ChainParams`]. Serializable so a host can persist
/// its own presets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChainSettings {
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub gate: GateSettings,
    pub compressor: CompressorSettings,
    pub limiter: LimiterSettings,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            input_gain_db: 0.0,
            output_gain_db: 0.0,
            gate: GateSettings::default(),
            compressor: CompressorSettings::default(),
            limiter: LimiterSettings::default(),
        }
    }
}

impl ChainSettings {
    /// Tuned for spoken-word podcast channels.
    pub fn podcast() -> Self {
        Self {
            input_gain_db: 1.6,
            output_gain_db: -1.9,
            gate: GateSettings {
                threshold_db: -50.0,
                ratio: 15.0,
                attack_ms: 2.0,
                release_ms: 150.0,
            },
            compressor: CompressorSettings {
                threshold_db: -24.0,
                ratio: 4.0,
                attack_ms: 2.0,
                release_ms: 50.0,
                knee_db: 3.0,
                makeup_db: 2.0,
                auto_makeup: false,
            },
            limiter: LimiterSettings {
                ceiling_db: -2.0,
                lookahead_ms: 2.0,
                release_ms: 50.0,
            },
        }
    }

    /// Hotter levels for live streaming.
    pub fn streaming() -> Self {
        Self {
            input_gain_db: 3.5,
            output_gain_db: -3.1,
            gate: GateSettings {
                threshold_db: -45.0,
                ratio: 20.0,
                attack_ms: 1.5,
                release_ms: 120.0,
            },
            compressor: CompressorSettings {
                threshold_db: -20.0,
                ratio: 6.0,
                attack_ms: 1.5,
                release_ms: 40.0,
                knee_db: 2.5,
                makeup_db: 3.0,
                auto_makeup: false,
            },
            limiter: LimiterSettings {
                ceiling_db: -1.5,
                lookahead_ms: 4.0,
                release_ms: 40.0,
            },
        }
    }

    /// Dense, up-front voice-over processing.
    pub fn voice_over() -> Self {
        Self {
            input_gain_db: 5.1,
            output_gain_db: -4.4,
            gate: GateSettings {
                threshold_db: -40.0,
                ratio: 25.0,
                attack_ms: 0.5,
                release_ms: 80.0,
            },
            compressor: CompressorSettings {
                threshold_db: -16.0,
                ratio: 8.0,
                attack_ms: 0.5,
                release_ms: 25.0,
                knee_db: 1.5,
                makeup_db: 4.0,
                auto_makeup: false,
            },
            limiter: LimiterSettings {
                ceiling_db: -0.5,
                lookahead_ms: 5.0,
                release_ms: 25.0,
            },
        }
    }
}

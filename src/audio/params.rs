//! Lock-free scalar parameter state shared between the control thread and
//! the audio callback.
//!
//! Each tunable is its own atomic. A torn read of an individual scalar would
//! be a bug; values that were stored on slightly different callbacks are
//! fine. There is deliberately no way to update several fields as one unit.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use super::types::ChainSettings;

/// An `f32` readable and writable atomically via its bit pattern.
#[derive(Debug)]
pub struct AtomicF32 {
    bits: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            bits: AtomicU32::new(value.to_bits()),
        }
    }

    #[inline]
    pub fn get(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Every tunable of the chain as an independently atomic scalar.
///
/// The control/UI thread stores, the audio thread loads at the top of each
/// block. Lookahead is the one exception: it is structural, so the audio
/// thread only reads it during `prepare`.
#[derive(Debug)]
pub struct ChainParams {
    pub enabled: AtomicBool,

    pub input_gain_db: AtomicF32,
    pub output_gain_db: AtomicF32,

    pub gate_threshold_db: AtomicF32,
    pub gate_ratio: AtomicF32,
    pub gate_attack_ms: AtomicF32,
    pub gate_release_ms: AtomicF32,

    pub comp_threshold_db: AtomicF32,
    pub comp_ratio: AtomicF32,
    pub comp_attack_ms: AtomicF32,
    pub comp_release_ms: AtomicF32,
    pub comp_knee_db: AtomicF32,
    pub comp_makeup_db: AtomicF32,
    pub comp_auto_makeup: AtomicBool,

    pub limiter_ceiling_db: AtomicF32,
    pub limiter_release_ms: AtomicF32,
    /// Structural: read during `prepare` only, never mid-stream.
    pub limiter_lookahead_ms: AtomicF32,
}

impl ChainParams {
    pub fn from_settings(settings: &ChainSettings) -> Self {
        Self {
            enabled: AtomicBool::new(true),

            input_gain_db: AtomicF32::new(settings.input_gain_db),
            output_gain_db: AtomicF32::new(settings.output_gain_db),

            gate_threshold_db: AtomicF32::new(settings.gate.threshold_db),
            gate_ratio: AtomicF32::new(settings.gate.ratio),
            gate_attack_ms: AtomicF32::new(settings.gate.attack_ms),
            gate_release_ms: AtomicF32::new(settings.gate.release_ms),

            comp_threshold_db: AtomicF32::new(settings.compressor.threshold_db),
            comp_ratio: AtomicF32::new(settings.compressor.ratio),
            comp_attack_ms: AtomicF32::new(settings.compressor.attack_ms),
            comp_release_ms: AtomicF32::new(settings.compressor.release_ms),
            comp_knee_db: AtomicF32::new(settings.compressor.knee_db),
            comp_makeup_db: AtomicF32::new(settings.compressor.makeup_db),
            comp_auto_makeup: AtomicBool::new(settings.compressor.auto_makeup),

            limiter_ceiling_db: AtomicF32::new(settings.limiter.ceiling_db),
            limiter_release_ms: AtomicF32::new(settings.limiter.release_ms),
            limiter_lookahead_ms: AtomicF32::new(settings.limiter.lookahead_ms),
        }
    }

    /// Store a full settings snapshot, one scalar at a time.
    pub fn apply_settings(&self, settings: &ChainSettings) {
        self.input_gain_db.set(settings.input_gain_db);
        self.output_gain_db.set(settings.output_gain_db);

        self.gate_threshold_db.set(settings.gate.threshold_db);
        self.gate_ratio.set(settings.gate.ratio);
        self.gate_attack_ms.set(settings.gate.attack_ms);
        self.gate_release_ms.set(settings.gate.release_ms);

        self.comp_threshold_db.set(settings.compressor.threshold_db);
        self.comp_ratio.set(settings.compressor.ratio);
        self.comp_attack_ms.set(settings.compressor.attack_ms);
        self.comp_release_ms.set(settings.compressor.release_ms);
        self.comp_knee_db.set(settings.compressor.knee_db);
        self.comp_makeup_db.set(settings.compressor.makeup_db);
        self.comp_auto_makeup
            .store(settings.compressor.auto_makeup, Ordering::Relaxed);

        self.limiter_ceiling_db.set(settings.limiter.ceiling_db);
        self.limiter_release_ms.set(settings.limiter.release_ms);
        self.limiter_lookahead_ms.set(settings.limiter.lookahead_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atomic_f32_roundtrip() {
        let value = AtomicF32::new(-18.5);
        assert_eq!(value.get(), -18.5);

        value.set(7.25);
        assert_eq!(value.get(), 7.25);
    }

    #[test]
    fn test_params_apply_settings() {
        let params = ChainParams::from_settings(&ChainSettings::default());

        let preset = ChainSettings::podcast();
        params.apply_settings(&preset);

        assert_eq!(params.comp_threshold_db.get(), -24.0);
        assert_eq!(params.gate_ratio.get(), 15.0);
        assert_eq!(params.limiter_ceiling_db.get(), -2.0);
    }
}

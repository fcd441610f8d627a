use super::{
    amplitude_to_db, db_to_linear, flush_denormal, time_to_coeff, validate_float, GainComputer,
};
use crate::audio::types::DEFAULT_SAMPLE_RATE;

/// Noise gate with a smoothed rectified-level detector.
///
/// Attenuates the block while the detector sits below the threshold; signal
/// at or above the threshold passes untouched. No lookahead: the gate
/// targets noise floors, not transients, so zero latency wins over a softer
/// edge. The detector signal is the cross-channel peak, and one gain is
/// applied to every channel to keep the stereo image intact.
#[derive(Debug)]
pub struct NoiseGate {
    sample_rate: f64,
    curve: GainComputer,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    envelope: f32,
    gain_reduction_db: f32,
}

impl NoiseGate {
    pub fn new() -> Self {
        let mut gate = Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            curve: GainComputer::new(-60.0, 10.0, 0.0),
            attack_ms: 1.0,
            release_ms: 100.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            envelope: 0.0,
            gain_reduction_db: 0.0,
        };
        gate.update_coefficients();
        gate
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.update_coefficients();
        self.envelope = 0.0;
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.curve.threshold_db = threshold_db;
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.curve.ratio = ratio.max(1.0);
    }

    pub fn set_attack(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.update_coefficients();
    }

    pub fn set_release(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.update_coefficients();
    }

    pub fn threshold_db(&self) -> f32 {
        self.curve.threshold_db
    }

    /// Attenuation applied during the last block, in dB.
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(self.attack_ms, self.sample_rate);
        self.release_coeff = time_to_coeff(self.release_ms, self.sample_rate);
    }

    /// Process `count` samples starting at `start`, in place.
    pub fn process_block(&mut self, channels: &mut [&mut [f32]], start: usize, count: usize) {
        if channels.is_empty() || count == 0 {
            self.gain_reduction_db = 0.0;
            return;
        }

        let mut max_reduction = 0.0f32;

        for i in start..start + count {
            let mut peak = 0.0f32;
            for ch in channels.iter() {
                peak = peak.max(validate_float(ch[i]).abs());
            }

            // One-pole smoothing of the rectified level, asymmetric
            let coeff = if peak > self.envelope {
                self.attack_coeff
            } else {
                self.release_coeff
            };
            self.envelope = flush_denormal(peak + (self.envelope - peak) * coeff);

            let level_db = amplitude_to_db(self.envelope);
            let gain = if level_db < self.curve.threshold_db {
                // Downward expansion: the shortfall below threshold plays
                // the role the overshoot plays in the compressor curve.
                let shortfall = self.curve.threshold_db - level_db;
                let reduction = self.curve.reduction_db(self.curve.threshold_db + shortfall);
                max_reduction = max_reduction.max(reduction);
                db_to_linear(-reduction)
            } else {
                1.0
            };

            for ch in channels.iter_mut() {
                ch[i] = validate_float(ch[i] * gain);
            }
        }

        self.gain_reduction_db = max_reduction;
    }

    /// Clear detector state.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.gain_reduction_db = 0.0;
    }
}

impl Default for NoiseGate {
    fn default() -> Self {
        Self::new()
    }
}

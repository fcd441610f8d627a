use super::{
    amplitude_to_db, db_to_linear, flush_denormal, time_to_coeff, validate_float, GainComputer,
    LinearSmoother,
};
use crate::audio::types::DEFAULT_SAMPLE_RATE;

/// Per-sample smoothing window for the applied gain reduction.
const GAIN_SMOOTHING_SECONDS: f64 = 0.01;

/// Detector floor assumed by the auto-makeup heuristic.
const AUTO_MAKEUP_FLOOR_DB: f32 = -60.0;

/// RMS-detected feed-forward compressor with soft knee and optional
/// automatic makeup gain.
///
/// Level detection runs once per block: RMS across every channel and sample,
/// converted to dB with a -100 dB floor. The resulting target reduction goes
/// through an asymmetric attack/release envelope, then a 10 ms per-sample
/// ramp, so the block-rate decision never steps audibly at block edges.
#[derive(Debug)]
pub struct Compressor {
    sample_rate: f64,
    curve: GainComputer,
    attack_ms: f32,
    release_ms: f32,
    attack_coeff: f32,
    release_coeff: f32,
    makeup_db: f32,
    auto_makeup: bool,
    envelope: f32,
    applied: LinearSmoother,
}

impl Compressor {
    pub fn new() -> Self {
        let mut compressor = Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            curve: GainComputer::new(-18.0, 3.0, 2.0),
            attack_ms: 1.0,
            release_ms: 30.0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup_db: 0.0,
            auto_makeup: false,
            envelope: 0.0,
            applied: LinearSmoother::new(0.0),
        };
        compressor.applied.reset(DEFAULT_SAMPLE_RATE, GAIN_SMOOTHING_SECONDS);
        compressor.update_coefficients();
        compressor
    }

    pub fn prepare(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.applied.reset(sample_rate, GAIN_SMOOTHING_SECONDS);
        self.update_coefficients();
    }

    pub fn set_threshold(&mut self, threshold_db: f32) {
        self.curve.threshold_db = threshold_db;
        self.refresh_auto_makeup();
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.curve.ratio = ratio.max(1.0);
        self.refresh_auto_makeup();
    }

    pub fn set_attack(&mut self, attack_ms: f32) {
        self.attack_ms = attack_ms.max(0.1);
        self.update_coefficients();
    }

    pub fn set_release(&mut self, release_ms: f32) {
        self.release_ms = release_ms.max(1.0);
        self.update_coefficients();
    }

    pub fn set_knee(&mut self, knee_db: f32) {
        self.curve.knee_db = knee_db.max(0.0);
    }

    /// Fixed makeup gain. Disables the automatic heuristic.
    pub fn set_makeup(&mut self, makeup_db: f32) {
        self.makeup_db = makeup_db;
        self.auto_makeup = false;
    }

    /// Derive makeup from threshold and ratio. Deliberately conservative,
    /// not a loudness match: `0.5 * (threshold - floor) / ratio`.
    pub fn set_auto_makeup(&mut self, enabled: bool) {
        self.auto_makeup = enabled;
        self.refresh_auto_makeup();
    }

    pub fn threshold_db(&self) -> f32 {
        self.curve.threshold_db
    }

    pub fn ratio(&self) -> f32 {
        self.curve.ratio
    }

    pub fn makeup_db(&self) -> f32 {
        self.makeup_db
    }

    /// Envelope value in dB, the metering output of this stage.
    pub fn gain_reduction_db(&self) -> f32 {
        self.envelope
    }

    fn refresh_auto_makeup(&mut self) {
        if self.auto_makeup {
            let compression_amount =
                (self.curve.threshold_db - AUTO_MAKEUP_FLOOR_DB) / self.curve.ratio;
            self.makeup_db = 0.5 * compression_amount;
        }
    }

    fn update_coefficients(&mut self) {
        self.attack_coeff = time_to_coeff(self.attack_ms, self.sample_rate);
        self.release_coeff = time_to_coeff(self.release_ms, self.sample_rate);
    }

    /// Process a block in place; returns the gain reduction (dB) for metering.
    pub fn process_block(
        &mut self,
        channels: &mut [&mut [f32]],
        start: usize,
        count: usize,
    ) -> f32 {
        if channels.is_empty() || count == 0 {
            return self.envelope;
        }

        let rms_db = amplitude_to_db(Self::rms_level(channels, start, count));
        let target = self.curve.reduction_db(rms_db);

        let coeff = if target > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(target + (self.envelope - target) * coeff);

        self.applied.set_target(self.envelope);

        for i in start..start + count {
            let gain = db_to_linear(-self.applied.next() + self.makeup_db);
            for ch in channels.iter_mut() {
                ch[i] = validate_float(ch[i] * gain);
            }
        }

        self.envelope
    }

    /// Clear envelope state.
    pub fn reset(&mut self) {
        self.envelope = 0.0;
        self.applied.set_current_and_target(0.0);
    }

    fn rms_level(channels: &[&mut [f32]], start: usize, count: usize) -> f32 {
        let mut sum_squares = 0.0f32;
        let mut sample_count = 0usize;

        for ch in channels.iter() {
            for &sample in &ch[start..start + count] {
                let sample = validate_float(sample);
                sum_squares += sample * sample;
                sample_count += 1;
            }
        }

        if sample_count > 0 {
            (sum_squares / sample_count as f32).sqrt()
        } else {
            0.0
        }
    }
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new()
    }
}

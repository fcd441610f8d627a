//! Metering taps shared with a UI thread.

use super::params::AtomicF32;

/// Peak level detector with decay for meter ballistics.
#[derive(Debug)]
pub struct PeakDetector {
    peak: f32,
    decay_factor: f32,
}

impl PeakDetector {
    pub fn new() -> Self {
        Self {
            peak: 0.0,
            decay_factor: 0.999, // Slow decay for visual meters
        }
    }

    /// Track the peak across a planar block. The held value decays once per
    /// call so a meter falls back after a transient.
    pub fn process_block(&mut self, channels: &[&mut [f32]], start: usize, count: usize) -> f32 {
        for ch in channels.iter() {
            for &sample in &ch[start..start + count] {
                let abs_sample = sample.abs();
                if abs_sample > self.peak {
                    self.peak = abs_sample;
                }
            }
        }

        self.peak *= self.decay_factor;
        self.peak
    }

    pub fn reset(&mut self) {
        self.peak = 0.0;
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Levels published by the audio thread once per block and read from a UI
/// thread with plain atomic loads. No getter has side effects.
#[derive(Debug)]
pub struct MeterState {
    input_peak: AtomicF32,
    output_peak: AtomicF32,
    gain_reduction_db: AtomicF32,
}

impl MeterState {
    pub fn new() -> Self {
        Self {
            input_peak: AtomicF32::new(0.0),
            output_peak: AtomicF32::new(0.0),
            gain_reduction_db: AtomicF32::new(0.0),
        }
    }

    pub(crate) fn publish(&self, input_peak: f32, output_peak: f32, gain_reduction_db: f32) {
        self.input_peak.set(input_peak);
        self.output_peak.set(output_peak);
        self.gain_reduction_db.set(gain_reduction_db);
    }

    /// Smoothed peak level ahead of the chain, linear.
    pub fn input_peak(&self) -> f32 {
        self.input_peak.get()
    }

    /// Smoothed peak level after the chain, linear.
    pub fn output_peak(&self) -> f32 {
        self.output_peak.get()
    }

    /// Combined gain reduction in dB: max of compressor and limiter.
    pub fn gain_reduction_db(&self) -> f32 {
        self.gain_reduction_db.get()
    }
}

impl Default for MeterState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_detector_tracks_and_decays() {
        let mut detector = PeakDetector::new();

        let mut loud = vec![0.8f32; 128];
        let mut channels: Vec<&mut [f32]> = vec![&mut loud];
        let peak = detector.process_block(&channels, 0, 128);
        assert!((peak - 0.8).abs() < 0.01);

        let mut silence = vec![0.0f32; 128];
        channels[0] = &mut silence;
        let mut decayed = peak;
        for _ in 0..2000 {
            decayed = detector.process_block(&channels, 0, 128);
        }
        assert!(decayed < 0.2, "peak should decay over silence: {decayed}");
    }

    #[test]
    fn test_meter_state_publish() {
        let meters = MeterState::new();
        meters.publish(0.5, 0.4, 6.0);

        assert_eq!(meters.input_peak(), 0.5);
        assert_eq!(meters.output_peak(), 0.4);
        assert_eq!(meters.gain_reduction_db(), 6.0);
    }
}

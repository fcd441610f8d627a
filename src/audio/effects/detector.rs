//! dB-domain gain-reduction curve shared by the gate and compressor.

/// Static gain curve for a downward dynamics stage.
///
/// Pure: holds a `(threshold, ratio, knee)` triple and maps a detector level
/// in dB to the required gain reduction in dB (>= 0). Inside the knee band
/// the effective ratio ramps linearly between 1 and `ratio`, which keeps the
/// curve exactly continuous at both band edges.
#[derive(Debug, Clone, Copy)]
pub struct GainComputer {
    pub threshold_db: f32,
    pub ratio: f32,
    pub knee_db: f32,
}

impl GainComputer {
    pub fn new(threshold_db: f32, ratio: f32, knee_db: f32) -> Self {
        Self {
            threshold_db,
            ratio: ratio.max(1.0),
            knee_db: knee_db.max(0.0),
        }
    }

    /// Required gain reduction in dB for a detector level in dB.
    #[inline]
    pub fn reduction_db(&self, level_db: f32) -> f32 {
        if self.knee_db > 0.0 {
            self.soft_knee_reduction(level_db)
        } else if level_db <= self.threshold_db {
            0.0
        } else {
            let over = level_db - self.threshold_db;
            over - over / self.ratio
        }
    }

    fn soft_knee_reduction(&self, level_db: f32) -> f32 {
        let knee_start = self.threshold_db - self.knee_db / 2.0;
        let knee_end = self.threshold_db + self.knee_db / 2.0;

        if level_db <= knee_start {
            0.0
        } else if level_db >= knee_end {
            // Above knee - full compression
            let over = level_db - self.threshold_db;
            over - over / self.ratio
        } else {
            // Ramp the effective ratio across the band, then apply the hard
            // knee formula with it. Floored at zero: below the threshold the
            // raw formula would yield a small negative reduction.
            let position = (level_db - knee_start) / self.knee_db;
            let effective_ratio = 1.0 + (self.ratio - 1.0) * position;
            let over = level_db - self.threshold_db;
            (over - over / effective_ratio).max(0.0)
        }
    }
}

//! The ordered dynamics chain driven by the audio callback.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::info;

use super::effects::{db_to_linear, Compressor, Limiter, LinearSmoother, NoiseGate};
use super::meters::{MeterState, PeakDetector};
use super::params::ChainParams;
use super::sink::OutputSink;
use super::types::{ChainConfig, ChainProfile, ChainSettings, DEFAULT_SAMPLE_RATE};

/// Trim gains ramp over 50 ms.
const TRIM_SMOOTHING_SECONDS: f64 = 0.05;
/// Meter levels ramp over 100 ms.
const METER_SMOOTHING_SECONDS: f64 = 0.1;

/// Gate -> compressor -> limiter chain with input/output trim, an atomic
/// parameter boundary and metering taps.
///
/// One real-time thread calls [`DynamicsChain::process`]; a control thread
/// mutates parameters through the setters (or the shared [`ChainParams`])
/// and reads [`MeterState`]. Structural changes (sample rate, block size,
/// lookahead, channel count) only happen in [`DynamicsChain::prepare`],
/// which must never run concurrently with `process`.
pub struct DynamicsChain {
    config: ChainConfig,
    params: Arc<ChainParams>,
    meters: Arc<MeterState>,

    input_gain: LinearSmoother,
    output_gain: LinearSmoother,
    input_level: LinearSmoother,
    output_level: LinearSmoother,
    input_peak: PeakDetector,
    output_peak: PeakDetector,

    gate: NoiseGate,
    compressor: Compressor,
    limiter: Option<Limiter>,

    sink: Option<Box<dyn OutputSink>>,

    cache: ParamCache,
}

/// Last-seen parameter values. Coefficient recomputation (and its `exp`
/// calls) only happens when a value actually changed.
#[derive(Debug, Clone, Copy)]
struct ParamCache {
    input_gain_db: f32,
    output_gain_db: f32,
    gate_threshold_db: f32,
    gate_ratio: f32,
    gate_attack_ms: f32,
    gate_release_ms: f32,
    comp_threshold_db: f32,
    comp_ratio: f32,
    comp_attack_ms: f32,
    comp_release_ms: f32,
    comp_knee_db: f32,
    comp_makeup_db: f32,
    comp_auto_makeup: bool,
    limiter_ceiling_db: f32,
    limiter_release_ms: f32,
}

impl ParamCache {
    /// NaN never compares equal, so the first sync pushes every value.
    fn stale() -> Self {
        Self {
            input_gain_db: f32::NAN,
            output_gain_db: f32::NAN,
            gate_threshold_db: f32::NAN,
            gate_ratio: f32::NAN,
            gate_attack_ms: f32::NAN,
            gate_release_ms: f32::NAN,
            comp_threshold_db: f32::NAN,
            comp_ratio: f32::NAN,
            comp_attack_ms: f32::NAN,
            comp_release_ms: f32::NAN,
            comp_knee_db: f32::NAN,
            comp_makeup_db: f32::NAN,
            comp_auto_makeup: false,
            limiter_ceiling_db: f32::NAN,
            limiter_release_ms: f32::NAN,
        }
    }
}

impl DynamicsChain {
    pub fn new(config: ChainConfig) -> Self {
        Self::with_settings(config, ChainSettings::default())
    }

    pub fn with_settings(config: ChainConfig, settings: ChainSettings) -> Self {
        let params = Arc::new(ChainParams::from_settings(&settings));
        let limiter = match config.profile {
            ChainProfile::Full => Some(Limiter::new()),
            ChainProfile::Lightweight => None,
        };

        let mut chain = Self {
            config: config.clone(),
            params,
            meters: Arc::new(MeterState::new()),
            input_gain: LinearSmoother::new(1.0),
            output_gain: LinearSmoother::new(1.0),
            input_level: LinearSmoother::new(0.0),
            output_level: LinearSmoother::new(0.0),
            input_peak: PeakDetector::new(),
            output_peak: PeakDetector::new(),
            gate: NoiseGate::new(),
            compressor: Compressor::new(),
            limiter,
            sink: None,
            cache: ParamCache::stale(),
        };
        chain.prepare(config.sample_rate, config.block_size);
        chain
    }

    /// Shared handle for the control thread.
    pub fn params(&self) -> Arc<ChainParams> {
        Arc::clone(&self.params)
    }

    /// Shared handle for the UI thread.
    pub fn meters(&self) -> Arc<MeterState> {
        Arc::clone(&self.meters)
    }

    pub fn profile(&self) -> ChainProfile {
        self.config.profile
    }

    /// Added output latency in samples (the limiter lookahead).
    pub fn latency_samples(&self) -> usize {
        self.limiter
            .as_ref()
            .map(|limiter| limiter.latency_samples())
            .unwrap_or(0)
    }

    pub fn attach_sink(&mut self, mut sink: Box<dyn OutputSink>) {
        sink.prepare(self.config.sample_rate, self.config.block_size);
        self.sink = Some(sink);
    }

    pub fn detach_sink(&mut self) -> Option<Box<dyn OutputSink>> {
        self.sink.take()
    }

    pub fn sink_mut(&mut self) -> Option<&mut (dyn OutputSink + 'static)> {
        self.sink.as_deref_mut()
    }

    /// Activate the attached sink. Non-real-time.
    pub fn activate_sink(&mut self) -> Result<()> {
        match &mut self.sink {
            Some(sink) => sink.activate(),
            None => bail!("no output sink attached"),
        }
    }

    // ---- parameter setters (callable from any thread) ------------------

    pub fn set_enabled(&self, enabled: bool) {
        self.params.enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.params.enabled.load(Ordering::Relaxed)
    }

    pub fn set_input_gain(&self, gain_db: f32) {
        self.params.input_gain_db.set(gain_db.clamp(-40.0, 40.0));
    }

    pub fn set_output_gain(&self, gain_db: f32) {
        self.params.output_gain_db.set(gain_db.clamp(-40.0, 40.0));
    }

    pub fn set_gate_threshold(&self, threshold_db: f32) {
        self.params
            .gate_threshold_db
            .set(threshold_db.clamp(-80.0, 0.0));
    }

    pub fn set_gate_ratio(&self, ratio: f32) {
        self.params.gate_ratio.set(ratio.clamp(1.0, 50.0));
    }

    pub fn set_gate_attack(&self, attack_ms: f32) {
        self.params.gate_attack_ms.set(attack_ms.clamp(0.1, 100.0));
    }

    pub fn set_gate_release(&self, release_ms: f32) {
        self.params
            .gate_release_ms
            .set(release_ms.clamp(1.0, 1000.0));
    }

    pub fn set_compressor_threshold(&self, threshold_db: f32) {
        self.params
            .comp_threshold_db
            .set(threshold_db.clamp(-60.0, 0.0));
    }

    pub fn set_compressor_ratio(&self, ratio: f32) {
        self.params.comp_ratio.set(ratio.clamp(1.0, 20.0));
    }

    pub fn set_compressor_attack(&self, attack_ms: f32) {
        self.params.comp_attack_ms.set(attack_ms.clamp(0.1, 100.0));
    }

    pub fn set_compressor_release(&self, release_ms: f32) {
        self.params
            .comp_release_ms
            .set(release_ms.clamp(1.0, 1000.0));
    }

    pub fn set_compressor_knee(&self, knee_db: f32) {
        self.params.comp_knee_db.set(knee_db.clamp(0.0, 20.0));
    }

    /// Fixed makeup gain; turns the automatic heuristic off.
    pub fn set_compressor_makeup(&self, makeup_db: f32) {
        self.params
            .comp_makeup_db
            .set(makeup_db.clamp(-20.0, 20.0));
        self.params.comp_auto_makeup.store(false, Ordering::Relaxed);
    }

    pub fn set_compressor_auto_makeup(&self, enabled: bool) {
        self.params
            .comp_auto_makeup
            .store(enabled, Ordering::Relaxed);
    }

    pub fn set_limiter_ceiling(&self, ceiling_db: f32) {
        self.params
            .limiter_ceiling_db
            .set(ceiling_db.clamp(-20.0, 0.0));
    }

    pub fn set_limiter_release(&self, release_ms: f32) {
        self.params
            .limiter_release_ms
            .set(release_ms.clamp(1.0, 1000.0));
    }

    /// Structural: the new lookahead is picked up by the next `prepare`.
    pub fn set_limiter_lookahead(&self, lookahead_ms: f32) {
        self.params
            .limiter_lookahead_ms
            .set(lookahead_ms.clamp(0.1, 10.0));
    }

    /// Store a full settings snapshot.
    pub fn apply_settings(&self, settings: &ChainSettings) {
        self.params.apply_settings(settings);
    }

    // ---- meter getters --------------------------------------------------

    pub fn input_peak(&self) -> f32 {
        self.meters.input_peak()
    }

    pub fn output_peak(&self) -> f32 {
        self.meters.output_peak()
    }

    pub fn gain_reduction_db(&self) -> f32 {
        self.meters.gain_reduction_db()
    }

    // ---- lifecycle ------------------------------------------------------

    /// Size every stage for the stream shape. Must be called while the
    /// audio thread is stopped; this is the only place buffers resize.
    pub fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            DEFAULT_SAMPLE_RATE
        };
        let block_size = block_size.max(1);

        self.config.sample_rate = sample_rate;
        self.config.block_size = block_size;

        self.input_gain.reset(sample_rate, TRIM_SMOOTHING_SECONDS);
        self.output_gain.reset(sample_rate, TRIM_SMOOTHING_SECONDS);
        self.input_level.reset(sample_rate, METER_SMOOTHING_SECONDS);
        self.output_level.reset(sample_rate, METER_SMOOTHING_SECONDS);

        self.gate.prepare(sample_rate);
        self.compressor.prepare(sample_rate);
        if let Some(limiter) = &mut self.limiter {
            limiter.set_lookahead(self.params.limiter_lookahead_ms.get());
            limiter.prepare(sample_rate, block_size, self.config.channels);
        }
        if let Some(sink) = &mut self.sink {
            sink.prepare(sample_rate, block_size);
        }

        self.cache = ParamCache::stale();
        self.sync_params();

        info!(
            "{} chain prepared: {} Hz, {} sample blocks, {} channels, latency {} samples",
            "CHAIN_PREPARE".cyan(),
            sample_rate,
            block_size,
            self.config.channels,
            self.latency_samples()
        );
    }

    /// Clear transient state. Safe to call repeatedly. Buffers keep their
    /// size, so processing after a release falls back to the last prepared
    /// shape instead of crashing.
    pub fn release(&mut self) {
        self.gate.reset();
        self.compressor.reset();
        if let Some(limiter) = &mut self.limiter {
            limiter.reset();
        }
        self.input_gain.set_current_and_target(self.input_gain.target());
        self.output_gain
            .set_current_and_target(self.output_gain.target());
        self.input_level.set_current_and_target(0.0);
        self.output_level.set_current_and_target(0.0);
        self.input_peak.reset();
        self.output_peak.reset();
        if let Some(sink) = &mut self.sink {
            sink.release();
        }
        self.meters.publish(0.0, 0.0, 0.0);

        info!("{} chain released", "CHAIN_RELEASE".cyan());
    }

    // ---- processing -----------------------------------------------------

    /// Process a block in place. Real-time safe: no allocation, no locks,
    /// no blocking. `count` may differ from the prepared block size.
    pub fn process(&mut self, channels: &mut [&mut [f32]], start: usize, count: usize) {
        if channels.is_empty() || count == 0 {
            return;
        }

        self.sync_params();

        if !self.params.enabled.load(Ordering::Relaxed) {
            // Bypass is an unmodified passthrough, never silence. Meters
            // keep tracking so the UI shows signal while bypassed.
            let peak = self.input_peak.process_block(channels, start, count);
            self.input_level.set_target(peak);
            self.output_level.set_target(peak);
            let input_level = self.input_level.next();
            let output_level = self.output_level.next();
            self.meters.publish(input_level, output_level, 0.0);
            return;
        }

        // Input level before any gain touches the signal
        let in_peak = self.input_peak.process_block(channels, start, count);
        self.input_level.set_target(in_peak);

        for i in start..start + count {
            let gain = self.input_gain.next();
            for ch in channels.iter_mut() {
                ch[i] *= gain;
            }
        }

        self.gate.process_block(channels, start, count);
        let compression_gr = self.compressor.process_block(channels, start, count);
        let limiting_gr = match &mut self.limiter {
            Some(limiter) => limiter.process_block(channels, start, count),
            None => 0.0,
        };

        for i in start..start + count {
            let gain = self.output_gain.next();
            for ch in channels.iter_mut() {
                ch[i] *= gain;
            }
        }

        let out_peak = self.output_peak.process_block(channels, start, count);
        self.output_level.set_target(out_peak);

        let input_level = self.input_level.next();
        let output_level = self.output_level.next();
        self.meters
            .publish(input_level, output_level, compression_gr.max(limiting_gr));

        if let Some(sink) = &mut self.sink {
            if sink.is_active() && sink.is_available() {
                let _ = sink.accepts(channels, start, count);
            }
        }
    }

    /// Push atomically stored parameters into the stages, recomputing
    /// coefficients only for values that changed.
    fn sync_params(&mut self) {
        let params = Arc::clone(&self.params);

        let v = params.input_gain_db.get();
        if v != self.cache.input_gain_db {
            self.input_gain.set_target(db_to_linear(v));
            self.cache.input_gain_db = v;
        }
        let v = params.output_gain_db.get();
        if v != self.cache.output_gain_db {
            self.output_gain.set_target(db_to_linear(v));
            self.cache.output_gain_db = v;
        }

        let v = params.gate_threshold_db.get();
        if v != self.cache.gate_threshold_db {
            self.gate.set_threshold(v);
            self.cache.gate_threshold_db = v;
        }
        let v = params.gate_ratio.get();
        if v != self.cache.gate_ratio {
            self.gate.set_ratio(v);
            self.cache.gate_ratio = v;
        }
        let v = params.gate_attack_ms.get();
        if v != self.cache.gate_attack_ms {
            self.gate.set_attack(v);
            self.cache.gate_attack_ms = v;
        }
        let v = params.gate_release_ms.get();
        if v != self.cache.gate_release_ms {
            self.gate.set_release(v);
            self.cache.gate_release_ms = v;
        }

        let v = params.comp_threshold_db.get();
        if v != self.cache.comp_threshold_db {
            self.compressor.set_threshold(v);
            self.cache.comp_threshold_db = v;
        }
        let v = params.comp_ratio.get();
        if v != self.cache.comp_ratio {
            self.compressor.set_ratio(v);
            self.cache.comp_ratio = v;
        }
        let v = params.comp_attack_ms.get();
        if v != self.cache.comp_attack_ms {
            self.compressor.set_attack(v);
            self.cache.comp_attack_ms = v;
        }
        let v = params.comp_release_ms.get();
        if v != self.cache.comp_release_ms {
            self.compressor.set_release(v);
            self.cache.comp_release_ms = v;
        }
        let v = params.comp_knee_db.get();
        if v != self.cache.comp_knee_db {
            self.compressor.set_knee(v);
            self.cache.comp_knee_db = v;
        }

        let auto = params.comp_auto_makeup.load(Ordering::Relaxed);
        let makeup = params.comp_makeup_db.get();
        if auto != self.cache.comp_auto_makeup {
            self.compressor.set_auto_makeup(auto);
            self.cache.comp_auto_makeup = auto;
            self.cache.comp_makeup_db = f32::NAN;
        }
        if !auto && makeup != self.cache.comp_makeup_db {
            self.compressor.set_makeup(makeup);
            self.cache.comp_makeup_db = makeup;
        }

        if let Some(limiter) = &mut self.limiter {
            let v = params.limiter_ceiling_db.get();
            if v != self.cache.limiter_ceiling_db {
                limiter.set_ceiling(v);
                self.cache.limiter_ceiling_db = v;
            }
            let v = params.limiter_release_ms.get();
            if v != self.cache.limiter_release_ms {
                limiter.set_release(v);
                self.cache.limiter_release_ms = v;
            }
        }
    }
}

impl std::fmt::Debug for DynamicsChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicsChain")
            .field("config", &self.config)
            .field("latency_samples", &self.latency_samples())
            .field("has_sink", &self.sink.is_some())
            .finish()
    }
}

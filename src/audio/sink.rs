//! Virtual output sink capability.
//!
//! The chain offers every processed block to an optional sink: a loopback
//! ring another thread drains, a platform virtual-device backend, a capture
//! client. Backends stay polymorphic behind [`OutputSink`] so the dynamics
//! core never links a concrete driver.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use anyhow::{bail, Result};
use colored::Colorize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("loopback consumer already taken")]
    ConsumerTaken,
    #[error("no virtual output backend is available")]
    Unavailable,
}

/// Capability interface for a virtual output device.
pub trait OutputSink: Send {
    /// Called from `prepare`, outside the real-time callback.
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        let _ = (sample_rate, block_size);
    }

    /// Offer one processed block. Runs on the audio thread: must not
    /// allocate, lock or block. Returns false when the block was not
    /// consumed (inactive sink, full transport).
    fn accepts(&mut self, channels: &[&mut [f32]], start: usize, count: usize) -> bool;

    fn is_active(&self) -> bool;
    fn is_available(&self) -> bool;

    /// Begin consuming blocks. Non-real-time.
    fn activate(&mut self) -> Result<()>;
    fn deactivate(&mut self);

    /// Drop transient state. Non-real-time, safe to call repeatedly.
    fn release(&mut self) {}
}

/// Lock-free loopback sink.
///
/// Interleaves the first two channels (mono input is duplicated) into an
/// SPSC ring buffer whose consuming end a capture thread drains. When the
/// ring fills up, samples are dropped and counted; the audio thread never
/// waits.
pub struct LoopbackSink {
    name: String,
    producer: rtrb::Producer<f32>,
    consumer: Option<rtrb::Consumer<f32>>,
    active: AtomicBool,
    dropped_samples: AtomicU64,
}

impl LoopbackSink {
    /// `capacity` is the interleaved ring capacity in samples.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        let (producer, consumer) = rtrb::RingBuffer::<f32>::new(capacity.max(2));
        Self {
            name: name.into(),
            producer,
            consumer: Some(consumer),
            active: AtomicBool::new(false),
            dropped_samples: AtomicU64::new(0),
        }
    }

    /// Take the consuming end of the ring. Can only be taken once.
    pub fn take_consumer(&mut self) -> Result<rtrb::Consumer<f32>, SinkError> {
        self.consumer.take().ok_or(SinkError::ConsumerTaken)
    }

    /// Interleaved samples dropped because the ring was full.
    pub fn dropped_samples(&self) -> u64 {
        self.dropped_samples.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl OutputSink for LoopbackSink {
    fn prepare(&mut self, sample_rate: f64, block_size: usize) {
        info!(
            "{} loopback sink '{}' prepared: {} Hz, {} sample blocks",
            "SINK_PREPARE".bright_blue(),
            self.name,
            sample_rate,
            block_size
        );
    }

    fn accepts(&mut self, channels: &[&mut [f32]], start: usize, count: usize) -> bool {
        if !self.is_active() || channels.is_empty() {
            return false;
        }

        let left = &channels[0];
        let right = channels.get(1).unwrap_or(&channels[0]);

        for i in start..start + count {
            if self.producer.slots() < 2 {
                let remaining = ((start + count - i) * 2) as u64;
                self.dropped_samples.fetch_add(remaining, Ordering::Relaxed);
                crate::audio_debug!(
                    "loopback '{}' ring full, dropping {} samples",
                    self.name,
                    remaining
                );
                return false;
            }
            let _ = self.producer.push(left[i]);
            let _ = self.producer.push(right[i]);
        }

        true
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn activate(&mut self) -> Result<()> {
        self.active.store(true, Ordering::Relaxed);
        info!(
            "{} loopback sink '{}' activated",
            "SINK_ACTIVE".bright_green(),
            self.name
        );
        Ok(())
    }

    fn deactivate(&mut self) {
        self.active.store(false, Ordering::Relaxed);
    }

    fn release(&mut self) {
        self.deactivate();
        info!(
            "{} loopback sink '{}' released",
            "SINK_RELEASE".bright_blue(),
            self.name
        );
    }
}

impl std::fmt::Debug for LoopbackSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopbackSink")
            .field("name", &self.name)
            .field("active", &self.is_active())
            .field("consumer_taken", &self.consumer.is_none())
            .field("dropped_samples", &self.dropped_samples())
            .finish()
    }
}

/// Placeholder for platforms with no virtual output backend.
#[derive(Debug, Default)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn accepts(&mut self, _channels: &[&mut [f32]], _start: usize, _count: usize) -> bool {
        false
    }

    fn is_active(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        false
    }

    fn activate(&mut self) -> Result<()> {
        bail!(SinkError::Unavailable)
    }

    fn deactivate(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_consumer_taken_once() {
        let mut sink = LoopbackSink::new("test", 64);
        assert!(sink.take_consumer().is_ok());
        assert!(matches!(
            sink.take_consumer(),
            Err(SinkError::ConsumerTaken)
        ));
    }

    #[test]
    fn test_loopback_interleaves_stereo() {
        let mut sink = LoopbackSink::new("test", 64);
        let mut consumer = sink.take_consumer().unwrap();
        sink.activate().unwrap();

        let mut left = vec![0.1f32, 0.2, 0.3];
        let mut right = vec![-0.1f32, -0.2, -0.3];
        let mut channels: Vec<&mut [f32]> = vec![&mut left, &mut right];
        assert!(sink.accepts(&mut channels, 0, 3));

        assert_eq!(consumer.pop().unwrap(), 0.1);
        assert_eq!(consumer.pop().unwrap(), -0.1);
        assert_eq!(consumer.pop().unwrap(), 0.2);
    }

    #[test]
    fn test_loopback_inactive_rejects() {
        let mut sink = LoopbackSink::new("test", 64);
        let mut samples = vec![0.5f32; 4];
        let mut channels: Vec<&mut [f32]> = vec![&mut samples];
        assert!(!sink.accepts(&mut channels, 0, 4));
    }

    #[test]
    fn test_loopback_counts_drops_when_full() {
        let mut sink = LoopbackSink::new("test", 4);
        sink.activate().unwrap();

        let mut samples = vec![0.5f32; 8];
        let mut channels: Vec<&mut [f32]> = vec![&mut samples];
        assert!(!sink.accepts(&mut channels, 0, 8));
        assert!(sink.dropped_samples() > 0);
    }

    #[test]
    fn test_null_sink_unavailable() {
        let mut sink = NullSink;
        assert!(!sink.is_available());
        assert!(sink.activate().is_err());
    }
}

use voxstrip::{
    ChainConfig, ChainProfile, ChainSettings, DynamicsChain, LoopbackSink, NullSink, OutputSink,
};

/// Full-chain behavior: ordering, bypass, metering, latency, sinks
#[cfg(test)]
mod chain_tests {
    use super::*;

    fn process_stereo(chain: &mut DynamicsChain, left: &mut [f32], right: &mut [f32]) {
        let count = left.len();
        let mut channels: Vec<&mut [f32]> = vec![left, right];
        chain.process(&mut channels, 0, count);
    }

    #[test]
    fn test_silence_in_silence_out() {
        let mut chain = DynamicsChain::new(ChainConfig::default());

        for _ in 0..4 {
            let mut left = vec![0.0f32; 512];
            let mut right = vec![0.0f32; 512];
            process_stereo(&mut chain, &mut left, &mut right);

            assert!(left.iter().all(|&x| x == 0.0));
            assert!(right.iter().all(|&x| x == 0.0));
        }

        assert_eq!(chain.gain_reduction_db(), 0.0);
        assert_eq!(chain.input_peak(), 0.0);
        assert_eq!(chain.output_peak(), 0.0);
    }

    #[test]
    fn test_bypass_is_unmodified_passthrough() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.set_enabled(false);
        assert!(!chain.is_enabled());

        let original: Vec<f32> = (0..512).map(|i| (i as f32 * 0.07).sin() * 0.9).collect();
        let mut left = original.clone();
        let mut right = original.clone();
        process_stereo(&mut chain, &mut left, &mut right);

        assert_eq!(left, original, "bypass must not touch the signal");
        assert_eq!(right, original);
        assert_eq!(chain.gain_reduction_db(), 0.0);
        // Meters keep tracking while bypassed
        assert!(chain.input_peak() > 0.0);
    }

    #[test]
    fn test_compressor_drives_combined_meter() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.set_gate_threshold(-80.0);
        chain.set_compressor_threshold(-20.0);
        chain.set_compressor_ratio(4.0);
        chain.set_compressor_knee(0.0);
        chain.set_compressor_attack(0.1);
        chain.set_compressor_release(100.0);
        chain.set_compressor_makeup(0.0);
        chain.set_limiter_ceiling(0.0); // out of the way

        let amplitude = 10f32.powf(-10.0 / 20.0);
        for _ in 0..300 {
            let mut left = vec![amplitude; 256];
            let mut right = vec![amplitude; 256];
            process_stereo(&mut chain, &mut left, &mut right);
        }

        let reduction = chain.gain_reduction_db();
        assert!(
            (reduction - 7.5).abs() < 0.5,
            "combined meter should follow the compressor: {reduction}"
        );
    }

    #[test]
    fn test_limiter_drives_combined_meter() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.set_gate_threshold(-80.0);
        chain.set_compressor_threshold(0.0); // out of the way
        chain.set_compressor_knee(0.0);
        chain.set_limiter_ceiling(-6.0);

        for _ in 0..20 {
            let mut left = vec![1.0f32; 512];
            let mut right = vec![1.0f32; 512];
            process_stereo(&mut chain, &mut left, &mut right);
        }

        let reduction = chain.gain_reduction_db();
        assert!(
            (reduction - 6.0).abs() < 0.5,
            "combined meter should follow the limiter: {reduction}"
        );
    }

    #[test]
    fn test_full_profile_reports_lookahead_latency() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.set_limiter_lookahead(3.0);
        chain.prepare(44_100.0, 512);
        assert_eq!(chain.latency_samples(), 132);

        chain.set_limiter_lookahead(5.0);
        // Structural: unchanged until the next prepare
        assert_eq!(chain.latency_samples(), 132);
        chain.prepare(44_100.0, 512);
        assert_eq!(chain.latency_samples(), 221);
    }

    #[test]
    fn test_lightweight_profile_has_zero_latency() {
        let config = ChainConfig {
            profile: ChainProfile::Lightweight,
            ..Default::default()
        };
        let mut chain = DynamicsChain::new(config);
        assert_eq!(chain.latency_samples(), 0);

        // An impulse comes out at the index it went in
        let mut left = vec![0.0f32; 512];
        left[10] = 0.5;
        let mut right = left.clone();
        process_stereo(&mut chain, &mut left, &mut right);

        assert!((left[10] - 0.5).abs() < 1e-6, "impulse moved or changed: {}", left[10]);
        for (i, &x) in left.iter().enumerate() {
            if i != 10 {
                assert!(x.abs() < 1e-4, "unexpected energy at {i}: {x}");
            }
        }
    }

    #[test]
    fn test_release_then_prepare_is_reproducible() {
        let input: Vec<f32> = (0..512).map(|i| (i as f32 * 0.11).sin() * 0.7).collect();

        let run = |chain: &mut DynamicsChain| -> Vec<f32> {
            let mut left = input.clone();
            let mut right = input.clone();
            process_stereo(chain, &mut left, &mut right);
            left
        };

        let mut chain = DynamicsChain::new(ChainConfig::default());
        let first = run(&mut chain);

        chain.release();
        chain.prepare(44_100.0, 512);
        let second = run(&mut chain);

        assert_eq!(first, second);
    }

    #[test]
    fn test_varying_count_and_offset() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.set_gate_threshold(-80.0);

        // Hosts may process sub-ranges of a larger buffer with changing counts
        let mut left = vec![0.2f32; 700];
        let mut right = vec![0.2f32; 700];
        let mut start = 0;
        for count in [100usize, 256, 344] {
            let mut channels: Vec<&mut [f32]> = vec![&mut left, &mut right];
            chain.process(&mut channels, start, count);
            start += count;
        }

        assert!(left.iter().all(|&x| x.is_finite()));
        assert!(left.iter().all(|&x| x.abs() <= 1.0));
    }

    #[test]
    fn test_loopback_sink_receives_processed_audio() {
        let config = ChainConfig {
            profile: ChainProfile::Lightweight,
            ..Default::default()
        };
        let mut chain = DynamicsChain::new(config);
        chain.set_gate_threshold(-80.0);

        let mut sink = LoopbackSink::new("capture", 1 << 14);
        let mut consumer = sink.take_consumer().unwrap();
        sink.activate().unwrap();
        chain.attach_sink(Box::new(sink));

        let mut left = vec![0.25f32; 256];
        let mut right = vec![0.25f32; 256];
        process_stereo(&mut chain, &mut left, &mut right);

        // The sink sees exactly the chain's output, interleaved
        for i in 0..256 {
            assert_eq!(consumer.pop().unwrap(), left[i], "left sample {i}");
            assert_eq!(consumer.pop().unwrap(), right[i], "right sample {i}");
        }
        assert!(consumer.pop().is_err(), "sink got extra samples");
    }

    #[test]
    fn test_null_sink_cannot_activate() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        assert!(chain.activate_sink().is_err(), "no sink attached yet");

        chain.attach_sink(Box::new(NullSink));
        assert!(chain.activate_sink().is_err());
        assert!(!chain.sink_mut().unwrap().is_active());
    }

    #[test]
    fn test_presets_carry_expected_values() {
        let podcast = ChainSettings::podcast();
        assert_eq!(podcast.compressor.threshold_db, -24.0);
        assert_eq!(podcast.gate.ratio, 15.0);
        assert_eq!(podcast.limiter.ceiling_db, -2.0);

        let streaming = ChainSettings::streaming();
        assert_eq!(streaming.compressor.ratio, 6.0);

        let voice_over = ChainSettings::voice_over();
        assert_eq!(voice_over.limiter.lookahead_ms, 5.0);

        // Settings are host-persistable
        let json = serde_json::to_string(&podcast).unwrap();
        assert!(json.contains("threshold_db"));
    }

    #[test]
    fn test_apply_settings_reaches_the_stages() {
        let mut chain = DynamicsChain::new(ChainConfig::default());
        chain.apply_settings(&ChainSettings {
            compressor: voxstrip::CompressorSettings {
                threshold_db: -20.0,
                ratio: 4.0,
                attack_ms: 0.1,
                release_ms: 100.0,
                knee_db: 0.0,
                makeup_db: 0.0,
                auto_makeup: false,
            },
            gate: voxstrip::GateSettings {
                threshold_db: -80.0,
                ..Default::default()
            },
            ..Default::default()
        });
        chain.set_limiter_ceiling(0.0);

        let amplitude = 10f32.powf(-10.0 / 20.0);
        for _ in 0..300 {
            let mut left = vec![amplitude; 256];
            let mut right = vec![amplitude; 256];
            process_stereo(&mut chain, &mut left, &mut right);
        }

        assert!((chain.gain_reduction_db() - 7.5).abs() < 0.5);
    }
}

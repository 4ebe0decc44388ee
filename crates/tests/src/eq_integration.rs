//! Integration tests for the equalizer processor
//!
//! These tests drive `EqProcessor` the way a host does: prepare once, then
//! feed blocks while the parameter store changes underneath.

use simpleeq_core::domain::*;
use simpleeq_infra::{SignalGenerator, TestSignal};
use simpleeq_tests::{all_finite, generate_impulse, generate_sine_wave, rms};
use std::sync::Arc;

fn prepared(params: Arc<ParameterStore>, sample_rate: f64, block_size: usize) -> EqProcessor {
    let mut eq = EqProcessor::new(params);
    eq.prepare(ProcessSpec::new(sample_rate, block_size)).unwrap();
    eq
}

fn stereo_buffer(left: Vec<f32>, right: Vec<f32>) -> AudioBuffer {
    AudioBuffer::from_channels(vec![left, right]).unwrap()
}

fn generated(signal: TestSignal, seed: u64, len: usize) -> Vec<f32> {
    let mut generator = SignalGenerator::with_seed(signal, 48000, 0.5, seed);
    let mut samples = vec![0.0; len];
    generator.fill(&mut samples);
    samples
}

fn sweep(len: usize) -> Vec<f32> {
    let signal = TestSignal::Sweep {
        start: 20.0,
        end: 20000.0,
        duration_secs: len as f32 / 48000.0,
    };
    generated(signal, 0, len)
}

fn shaped_params() -> Arc<ParameterStore> {
    let params = Arc::new(ParameterStore::new());
    params
        .apply_settings(&ChainSettings {
            low_cut_freq: 120.0,
            high_cut_freq: 9000.0,
            peak_freq: 1500.0,
            peak_gain_db: 7.5,
            peak_quality: 1.4,
            low_cut_slope: Slope::Db36,
            high_cut_slope: Slope::Db24,
        })
        .unwrap();
    params
}

// ============================================================================
// SCENARIOS
// ============================================================================

#[test]
fn test_default_settings_peak_is_near_identity() {
    let mut eq = prepared(Arc::new(ParameterStore::new()), 44100.0, 512);
    let mut buffer = stereo_buffer(vec![0.0; 512], vec![0.0; 512]);
    eq.process_block(&mut buffer, 2).unwrap();

    let chain = eq.chain().left();
    assert_eq!(chain.low_cut().active_stages(), 1);
    assert_eq!(chain.high_cut().active_stages(), 1);

    // 0 dB peak: numerator equals denominator
    let mut peak = BiquadStage::new(*chain.peak().coefficients());
    let mut impulse = generate_impulse(64);
    peak.process(&mut impulse);

    assert!((impulse[0] - 1.0).abs() < 1e-6);
    assert!(impulse[1..].iter().all(|s| s.abs() < 1e-6));
}

#[test]
fn test_split_blocks_match_single_block() {
    let left = generate_sine_wave(440.0, 48000, 1024);
    let right = generate_sine_wave(3000.0, 48000, 1024);

    let mut whole = prepared(shaped_params(), 48000.0, 1024);
    let mut one_shot = stereo_buffer(left.clone(), right.clone());
    whole.process_block(&mut one_shot, 2).unwrap();

    let mut split = prepared(shaped_params(), 48000.0, 512);
    let mut first = stereo_buffer(left[..512].to_vec(), right[..512].to_vec());
    let mut second = stereo_buffer(left[512..].to_vec(), right[512..].to_vec());
    split.process_block(&mut first, 2).unwrap();
    split.process_block(&mut second, 2).unwrap();

    for ch in 0..2 {
        let joined: Vec<f32> = first
            .channel(ch)
            .unwrap()
            .iter()
            .chain(second.channel(ch).unwrap())
            .copied()
            .collect();
        assert_eq!(joined.as_slice(), one_shot.channel(ch).unwrap());
    }
}

#[test]
fn test_split_sweep_matches_single_block() {
    let input = sweep(1024);

    let mut whole = prepared(shaped_params(), 48000.0, 1024);
    let mut one_shot = stereo_buffer(input.clone(), input.clone());
    whole.process_block(&mut one_shot, 2).unwrap();

    let mut split = prepared(shaped_params(), 48000.0, 512);
    let mut joined = Vec::with_capacity(1024);
    for half in input.chunks(512) {
        let mut block = stereo_buffer(half.to_vec(), half.to_vec());
        split.process_block(&mut block, 2).unwrap();
        joined.extend_from_slice(block.channel(0).unwrap());
        assert_eq!(block.channel(0).unwrap(), block.channel(1).unwrap());
    }

    assert_eq!(joined.as_slice(), one_shot.channel(0).unwrap());
    assert!(all_finite(&joined));
}

#[test]
fn test_silence_in_silence_out() {
    let mut eq = prepared(shaped_params(), 48000.0, 256);

    for _ in 0..4 {
        let mut buffer = stereo_buffer(vec![0.0; 256], vec![0.0; 256]);
        eq.process_block(&mut buffer, 2).unwrap();
        assert!(buffer.channel(0).unwrap().iter().all(|&s| s == 0.0));
        assert!(buffer.channel(1).unwrap().iter().all(|&s| s == 0.0));
    }
}

#[test]
fn test_single_stage_cut_equals_one_biquad() {
    let params = Arc::new(ParameterStore::new());
    params.set(ParamId::LowCutFreq, 500.0).unwrap();
    let mut eq = prepared(params, 48000.0, 256);

    let mut bank = eq.chain().left().low_cut().clone();
    let mut reference = BiquadStage::new(design_high_pass(500.0, 48000.0, 2).as_slice()[0]);

    let input = generate_sine_wave(90.0, 48000, 256);
    let mut via_bank = input.clone();
    let mut via_stage = input;
    bank.process(&mut via_bank);
    reference.process(&mut via_stage);
    assert_eq!(via_bank, via_stage);

    // The processor still runs normally afterwards
    let mut buffer = stereo_buffer(vec![0.1; 256], vec![0.1; 256]);
    eq.process_block(&mut buffer, 2).unwrap();
}

#[test]
fn test_channels_are_independent() {
    let mut eq = prepared(shaped_params(), 48000.0, 512);
    let mut buffer = stereo_buffer(generate_sine_wave(1500.0, 48000, 512), vec![0.0; 512]);
    eq.process_block(&mut buffer, 2).unwrap();

    assert!(rms(buffer.channel(0).unwrap()) > 0.1);
    assert!(buffer.channel(1).unwrap().iter().all(|&s| s == 0.0));
}

#[test]
fn test_left_output_ignores_right_input() {
    let left = generated(TestSignal::WhiteNoise, 1, 8 * 256);
    let mut outputs = Vec::new();

    for right_seed in [2, 3] {
        let right = generated(TestSignal::WhiteNoise, right_seed, 8 * 256);
        let mut eq = prepared(shaped_params(), 48000.0, 256);
        let mut out = Vec::with_capacity(left.len());

        for (l, r) in left.chunks(256).zip(right.chunks(256)) {
            let mut block = stereo_buffer(l.to_vec(), r.to_vec());
            eq.process_block(&mut block, 2).unwrap();
            out.extend_from_slice(block.channel(0).unwrap());
        }
        outputs.push(out);
    }

    assert_eq!(outputs[0], outputs[1]);
    assert!(rms(&outputs[0]) > 0.01);
}

#[test]
fn test_mono_input_clears_right_output() {
    let mut eq = prepared(Arc::new(ParameterStore::new()), 48000.0, 128);
    let mut buffer = stereo_buffer(generate_sine_wave(1000.0, 48000, 128), vec![0.8; 128]);

    eq.process_block(&mut buffer, 1).unwrap();

    assert!(buffer.channel(1).unwrap().iter().all(|&s| s == 0.0));
    assert!(rms(buffer.channel(0).unwrap()) > 0.1);
}

// ============================================================================
// PARAMETER CHANGES
// ============================================================================

#[test]
fn test_slope_change_between_blocks() {
    let params = Arc::new(ParameterStore::new());
    let mut eq = prepared(Arc::clone(&params), 48000.0, 256);

    for slope in [Slope::Db48, Slope::Db12, Slope::Db36, Slope::Db24] {
        params.set_high_cut_slope(slope);
        let mut buffer = stereo_buffer(vec![0.25; 256], vec![0.25; 256]);
        eq.process_block(&mut buffer, 2).unwrap();

        let bank = eq.chain().right().high_cut();
        assert_eq!(bank.active_stages(), slope.stage_count());
        for i in 0..MAX_CUT_STAGES {
            assert_eq!(!bank.stage(i).unwrap().is_bypassed(), i < slope.stage_count());
        }
        assert!(all_finite(buffer.channel(0).unwrap()));
    }
}

#[test]
fn test_peak_boost_raises_level() {
    let params = Arc::new(ParameterStore::new());
    params.set(ParamId::PeakFreq, 1000.0).unwrap();
    let mut eq = prepared(Arc::clone(&params), 48000.0, 4800);

    let tone = generate_sine_wave(1000.0, 48000, 4800);
    let mut flat = stereo_buffer(tone.clone(), tone.clone());
    eq.process_block(&mut flat, 2).unwrap();

    params.set(ParamId::PeakGain, 12.0).unwrap();
    let mut boosted = stereo_buffer(tone.clone(), tone);
    eq.process_block(&mut boosted, 2).unwrap();

    let boosted_rms = rms(&boosted.channel(0).unwrap()[2400..]);
    let flat_rms = rms(&flat.channel(0).unwrap()[2400..]);
    let gain_db = 20.0 * (boosted_rms / flat_rms).log10();
    assert!((gain_db - 12.0).abs() < 0.5, "{gain_db} dB");
}

#[test]
fn test_steeper_low_cut_attenuates_more() {
    let tone = generate_sine_wave(100.0, 48000, 9600);
    let mut levels = Vec::new();

    for slope in Slope::ALL {
        let params = Arc::new(ParameterStore::new());
        params.set(ParamId::LowCutFreq, 400.0).unwrap();
        params.set_low_cut_slope(slope);

        let mut eq = prepared(params, 48000.0, 9600);
        let mut buffer = stereo_buffer(tone.clone(), tone.clone());
        eq.process_block(&mut buffer, 2).unwrap();
        levels.push(rms(&buffer.channel(0).unwrap()[4800..]));
    }

    for pair in levels.windows(2) {
        assert!(pair[1] < pair[0], "{levels:?}");
    }
}

#[test]
fn test_effect_trait_object() {
    let mut eq = prepared(shaped_params(), 48000.0, 64);
    let effect: &mut dyn Effect = &mut eq;

    let mut frames: Vec<f32> = generate_sine_wave(1500.0, 48000, 128);
    effect.process(&mut frames).unwrap();
    assert_eq!(effect.name(), "SimpleEQ");
    assert!(all_finite(&frames));
}

#[test]
fn test_prepare_resets_state() {
    let params = shaped_params();
    let mut eq = prepared(Arc::clone(&params), 48000.0, 256);

    let mut loud = stereo_buffer(vec![0.9; 256], vec![-0.9; 256]);
    eq.process_block(&mut loud, 2).unwrap();

    eq.prepare(ProcessSpec::new(48000.0, 256)).unwrap();
    let mut silent = stereo_buffer(vec![0.0; 256], vec![0.0; 256]);
    eq.process_block(&mut silent, 2).unwrap();

    assert!(silent.channel(0).unwrap().iter().all(|&s| s == 0.0));
}

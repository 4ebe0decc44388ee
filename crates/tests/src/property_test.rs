//! Property-based tests for the filter chain
//!
//! These tests use proptest to verify invariants across many random settings.

use proptest::prelude::*;
use simpleeq_core::domain::*;
use simpleeq_tests::all_finite;
use std::sync::Arc;

fn slope_strategy() -> impl Strategy<Value = Slope> {
    (0usize..4).prop_map(|i| Slope::from_index(i).unwrap())
}

fn settings_strategy() -> impl Strategy<Value = ChainSettings> {
    (
        20.0f32..20000.0,
        20.0f32..20000.0,
        20.0f32..20000.0,
        -24.0f32..24.0,
        0.1f32..10.0,
        slope_strategy(),
        slope_strategy(),
    )
        .prop_map(|(low_cut, high_cut, peak_freq, peak_gain_db, peak_quality, low, high)| {
            ChainSettings {
                low_cut_freq: low_cut,
                high_cut_freq: high_cut,
                peak_freq,
                peak_gain_db,
                peak_quality,
                low_cut_slope: low,
                high_cut_slope: high,
            }
        })
}

fn sample_rate_strategy() -> impl Strategy<Value = f64> {
    prop::sample::select(vec![44100.0, 48000.0, 88200.0, 96000.0, 192000.0])
}

proptest! {
    /// Property: topology leaves exactly k+1 stages enabled from index 0
    #[test]
    fn topology_enables_contiguous_prefix(
        slope in slope_strategy(),
        freq in 20.0f64..20000.0,
        sample_rate in sample_rate_strategy(),
    ) {
        let mut bank = FilterBank::new();
        let cascade = design_low_pass(freq, sample_rate, slope.order());
        prop_assert_eq!(cascade.len(), slope.stage_count());

        bank.apply_topology(slope.stage_count(), cascade.as_slice());

        let enabled: Vec<bool> = bank.stages().iter().map(|s| !s.is_bypassed()).collect();
        let k = slope.index();
        prop_assert!(enabled[..=k].iter().all(|&e| e));
        prop_assert_eq!(enabled[k + 1..].iter().filter(|&&e| !e).count(), 3 - k);
    }

    /// Property: updating twice with the same settings changes nothing
    #[test]
    fn update_all_filters_is_idempotent(
        settings in settings_strategy(),
        sample_rate in sample_rate_strategy(),
    ) {
        let mut chain = StereoChain::new();
        chain.update_all_filters(&settings, sample_rate);
        let once = chain.clone();

        chain.update_all_filters(&settings, sample_rate);
        prop_assert_eq!(once, chain);
    }

    /// Property: silence stays exactly silent for any settings
    #[test]
    fn silence_is_preserved(
        settings in settings_strategy(),
        sample_rate in sample_rate_strategy(),
        len in 1usize..1024,
    ) {
        let params = Arc::new(ParameterStore::from_settings(&settings).unwrap());
        let mut eq = EqProcessor::new(params);
        eq.prepare(ProcessSpec::new(sample_rate, 1024)).unwrap();

        let mut buffer = AudioBuffer::new(2, len);
        eq.process_block(&mut buffer, 2).unwrap();

        prop_assert!(buffer.channel(0).unwrap().iter().all(|&s| s == 0.0));
        prop_assert!(buffer.channel(1).unwrap().iter().all(|&s| s == 0.0));
    }

    /// Property: the chain never produces NaN or Inf for bounded input
    #[test]
    fn output_is_finite(
        settings in settings_strategy(),
        sample_rate in sample_rate_strategy(),
        samples in prop::collection::vec(-1.0f32..1.0, 64..1024),
    ) {
        let mut chain = StereoChain::new();
        chain.update_all_filters(&settings, sample_rate);

        let mut left = samples.clone();
        let mut right = samples;
        chain.process(&mut left, &mut right);

        prop_assert!(all_finite(&left), "left channel produced NaN or Inf");
        prop_assert_eq!(left, right);
    }

    /// Property: stored values always sit inside the declared range
    #[test]
    fn store_clamps_to_declared_range(
        value in -1.0e6f32..1.0e6,
        index in 0usize..5,
    ) {
        let store = ParameterStore::new();
        let id = ParamId::ALL[index];
        store.set(id, value).unwrap();

        let range = id.range().unwrap();
        prop_assert!(range.contains(store.get(id)));
    }

    /// Property: normalised mapping round-trips within one interval step
    #[test]
    fn normalised_roundtrip(normalised in 0.0f32..=1.0, index in 0usize..5) {
        let id = ParamId::ALL[index];
        let range = id.range().unwrap();

        let plain = range.convert_from_normalised(normalised);
        let back = range.convert_from_normalised(range.convert_to_normalised(plain));
        prop_assert!((plain - back).abs() <= range.interval.max(1e-3));
    }

    /// Property: slope indices outside 0..=3 are rejected without side effects
    #[test]
    fn invalid_slope_index_rejected(index in 4i64..1000) {
        let store = ParameterStore::new();
        prop_assert!(store.set_choice(ParamId::LowCutSlope, index).is_err());
        prop_assert_eq!(store.capture_settings().low_cut_slope, Slope::Db12);
    }
}

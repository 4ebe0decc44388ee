//! Filter-chain topology: cut-filter banks, mono paths and the stereo pair
//!
//! Each channel runs low-cut bank -> peak stage -> high-cut bank. A cut bank
//! is a fixed array of four biquad stages; the selected slope decides how
//! many of them (from index 0) are enabled, the rest are bypassed. Nothing
//! here allocates, so topology and coefficient updates can run on the audio
//! thread before every block.

use crate::domain::dsp::{
    decibels_to_gain, design_high_pass, design_low_pass, BiquadCoeffs, BiquadStage,
};
use crate::domain::params::ChainSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

/// Number of biquad stages in a cut-filter bank
pub const MAX_CUT_STAGES: usize = 4;

// ============================================================================
// SLOPE
// ============================================================================

/// Roll-off steepness of a cut filter
///
/// Selector `k` (0-based) is a Butterworth filter of order `2 * (k + 1)`,
/// realised as `k + 1` cascaded biquads, i.e. `12 * (k + 1)` dB/octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    pub const ALL: [Slope; 4] = [Slope::Db12, Slope::Db24, Slope::Db36, Slope::Db48];

    /// Look up a slope from its selector index
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Selector index (0..=3)
    pub fn index(self) -> usize {
        match self {
            Slope::Db12 => 0,
            Slope::Db24 => 1,
            Slope::Db36 => 2,
            Slope::Db48 => 3,
        }
    }

    /// Number of enabled biquad stages
    pub fn stage_count(self) -> usize {
        self.index() + 1
    }

    /// Butterworth filter order
    pub fn order(self) -> usize {
        2 * self.stage_count()
    }

    pub fn db_per_octave(self) -> u32 {
        12 * self.stage_count() as u32
    }

    /// Label shown to users
    pub fn label(self) -> &'static str {
        match self {
            Slope::Db12 => "12 db/oct",
            Slope::Db24 => "24 db/oct",
            Slope::Db36 => "36 db/oct",
            Slope::Db48 => "48 db/oct",
        }
    }
}

impl fmt::Display for Slope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// FILTER BANK
// ============================================================================

/// Cascade of up to four biquads forming one cut filter
///
/// Invariant: exactly `active_stages()` contiguous stages starting at index 0
/// are enabled and every higher stage is bypassed.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterBank {
    stages: [BiquadStage; MAX_CUT_STAGES],
    active: usize,
}

impl Default for FilterBank {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterBank {
    /// Create a bank with every stage bypassed
    pub fn new() -> Self {
        let mut stages: [BiquadStage; MAX_CUT_STAGES] = Default::default();
        for stage in &mut stages {
            stage.set_bypassed(true);
        }
        Self { stages, active: 0 }
    }

    /// Enable the first `stage_count` stages with `coefficients[i]` on stage `i`
    ///
    /// All stages are bypassed first, so no stage from a previous, larger
    /// topology can stay active with stale coefficients.
    ///
    /// # Panics
    /// If `stage_count` is outside `1..=4` or fewer than `stage_count`
    /// coefficient sets are supplied. Both indicate a mismatch between the
    /// slope selector and the bank, never a runtime condition.
    pub fn apply_topology(&mut self, stage_count: usize, coefficients: &[BiquadCoeffs]) {
        assert!(
            (1..=MAX_CUT_STAGES).contains(&stage_count),
            "cut filter stage count must be in 1..={MAX_CUT_STAGES} (got {stage_count})"
        );
        assert!(
            coefficients.len() >= stage_count,
            "{} coefficient sets supplied for {} stages",
            coefficients.len(),
            stage_count
        );

        for stage in &mut self.stages {
            stage.set_bypassed(true);
        }

        for (stage, coeffs) in self.stages.iter_mut().zip(coefficients).take(stage_count) {
            stage.set_coefficients(*coeffs);
            stage.set_bypassed(false);
        }

        if self.active != stage_count {
            trace!(from = self.active, to = stage_count, "Cut filter topology changed");
            self.active = stage_count;
        }
    }

    /// Number of enabled stages
    pub fn active_stages(&self) -> usize {
        self.active
    }

    pub fn stage(&self, index: usize) -> Option<&BiquadStage> {
        self.stages.get(index)
    }

    pub fn stages(&self) -> &[BiquadStage] {
        &self.stages
    }

    /// Process a single sample through every stage
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        self.stages
            .iter_mut()
            .fold(x, |acc, stage| stage.process_sample(acc))
    }

    /// Process a buffer stage by stage
    pub fn process(&mut self, buffer: &mut [f32]) {
        for stage in &mut self.stages {
            stage.process(buffer);
        }
    }

    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
    }

    /// Linear magnitude of the enabled stages at `freq` Hz
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        self.stages
            .iter()
            .filter(|stage| !stage.is_bypassed())
            .map(|stage| stage.coefficients().magnitude_at(freq, sample_rate))
            .product()
    }
}

// ============================================================================
// MONO CHAIN
// ============================================================================

/// One channel's signal path: low-cut bank -> peak stage -> high-cut bank
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonoChain {
    low_cut: FilterBank,
    peak: BiquadStage,
    high_cut: FilterBank,
}

impl MonoChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn low_cut(&self) -> &FilterBank {
        &self.low_cut
    }

    pub fn peak(&self) -> &BiquadStage {
        &self.peak
    }

    pub fn high_cut(&self) -> &FilterBank {
        &self.high_cut
    }

    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let y = self.low_cut.process_sample(x);
        let y = self.peak.process_sample(y);
        self.high_cut.process_sample(y)
    }

    /// Process a block in place, one stage at a time
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.low_cut.process(buffer);
        self.peak.process(buffer);
        self.high_cut.process(buffer);
    }

    pub fn reset(&mut self) {
        self.low_cut.reset();
        self.peak.reset();
        self.high_cut.reset();
    }

    /// Linear magnitude of the whole path at `freq` Hz
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        self.low_cut.magnitude_at(freq, sample_rate)
            * self.peak.coefficients().magnitude_at(freq, sample_rate)
            * self.high_cut.magnitude_at(freq, sample_rate)
    }
}

// ============================================================================
// STEREO CHAIN
// ============================================================================

/// Dual-mono pair of chains sharing coefficients but not state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StereoChain {
    left: MonoChain,
    right: MonoChain,
}

impl StereoChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn left(&self) -> &MonoChain {
        &self.left
    }

    pub fn right(&self) -> &MonoChain {
        &self.right
    }

    /// Design the peak band and apply it to both channels
    pub fn update_peak(&mut self, freq: f32, gain_db: f32, q: f32, sample_rate: f64) {
        let coeffs = BiquadCoeffs::peak(
            sample_rate,
            f64::from(freq),
            f64::from(q),
            f64::from(decibels_to_gain(gain_db)),
        );
        self.left.peak.set_coefficients(coeffs);
        self.right.peak.set_coefficients(coeffs);
    }

    /// Design the high-pass cascade and apply it to both low-cut banks
    pub fn update_low_cut(&mut self, freq: f32, slope: Slope, sample_rate: f64) {
        let cascade = design_high_pass(f64::from(freq), sample_rate, slope.order());
        self.left.low_cut.apply_topology(slope.stage_count(), cascade.as_slice());
        self.right.low_cut.apply_topology(slope.stage_count(), cascade.as_slice());
    }

    /// Design the low-pass cascade and apply it to both high-cut banks
    pub fn update_high_cut(&mut self, freq: f32, slope: Slope, sample_rate: f64) {
        let cascade = design_low_pass(f64::from(freq), sample_rate, slope.order());
        self.left.high_cut.apply_topology(slope.stage_count(), cascade.as_slice());
        self.right.high_cut.apply_topology(slope.stage_count(), cascade.as_slice());
    }

    /// Recompute every band from a settings snapshot
    ///
    /// A pure function of `(settings, sample_rate)`: repeated calls with the
    /// same inputs leave identical coefficients and topology.
    pub fn update_all_filters(&mut self, settings: &ChainSettings, sample_rate: f64) {
        self.update_peak(
            settings.peak_freq,
            settings.peak_gain_db,
            settings.peak_quality,
            sample_rate,
        );
        self.update_low_cut(settings.low_cut_freq, settings.low_cut_slope, sample_rate);
        self.update_high_cut(settings.high_cut_freq, settings.high_cut_slope, sample_rate);
    }

    /// Process one block of each channel through its own chain
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32]) {
        self.left.process(left);
        self.right.process(right);
    }

    /// Process one interleaved stereo frame
    #[inline]
    pub fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        (self.left.process_sample(left), self.right.process_sample(right))
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}

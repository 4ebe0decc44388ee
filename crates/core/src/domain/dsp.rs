//! Biquad primitives for the equalizer filter chain
//!
//! This module provides:
//! - `BiquadCoeffs`: second-order section coefficients and their design
//!   (Butterworth low/high-pass sections, peaking EQ)
//! - `CascadeCoeffs` with `design_low_pass` / `design_high_pass`, the
//!   high-order Butterworth designs used by the cut filters
//! - `BiquadStage`: a bypassable Direct Form I section
//! - `Effect`: the in-place processing trait shared by whole processors
//!
//! Everything on the sample path is allocation-free.

use crate::domain::audio::Result;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Largest number of second-order sections a cascade design can produce
pub const MAX_CASCADE_SECTIONS: usize = 4;

/// Cutoff frequencies are kept strictly below Nyquist by this ratio of the
/// sample rate, otherwise the bilinear pre-warp diverges.
const MAX_CUTOFF_RATIO: f64 = 0.49;

/// Lowest frequency any design accepts
const MIN_DESIGN_FREQ: f64 = 2.0;

/// Gain (dB) at or below which `decibels_to_gain` returns silence
pub const MINUS_INFINITY_DB: f32 = -100.0;

/// Core trait for in-place audio processors
///
/// Processors work on interleaved f32 buffers normalized to [-1.0, 1.0].
pub trait Effect: Send + Sync {
    /// Process a buffer of interleaved audio samples in-place
    ///
    /// # Requirements
    /// - No allocations in the hot path
    /// - Handle buffer of any size
    fn process(&mut self, buffer: &mut [f32]) -> Result<()>;

    /// Reset processor state to initial conditions
    ///
    /// Clears delay lines. Called on stream (re)start.
    fn reset(&mut self);

    /// Get processor name for debugging/display
    fn name(&self) -> &str;
}

/// Convert decibels to a linear gain factor
///
/// Values at or below `MINUS_INFINITY_DB` map to 0.
#[inline]
pub fn decibels_to_gain(db: f32) -> f32 {
    if db > MINUS_INFINITY_DB {
        10.0_f32.powf(db * 0.05)
    } else {
        0.0
    }
}

/// Convert a linear gain factor to decibels, floored at `MINUS_INFINITY_DB`
#[inline]
pub fn gain_to_decibels(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(MINUS_INFINITY_DB)
    } else {
        MINUS_INFINITY_DB
    }
}

// ============================================================================
// BIQUAD COEFFICIENTS
// ============================================================================

/// Biquad filter coefficients
///
/// Stored normalized so that `a0 == 1`. The design math runs in f64 and is
/// rounded once when the coefficients are built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadCoeffs {
    /// Numerator coefficients
    pub b0: f32,
    pub b1: f32,
    pub b2: f32,
    /// Denominator coefficients (a0 is normalized to 1.0)
    pub a1: f32,
    pub a2: f32,
}

impl Default for BiquadCoeffs {
    fn default() -> Self {
        Self::identity()
    }
}

impl BiquadCoeffs {
    /// Unity gain (no filtering)
    pub const fn identity() -> Self {
        Self {
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
        }
    }

    fn from_raw(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0: (b0 / a0) as f32,
            b1: (b1 / a0) as f32,
            b2: (b2 / a0) as f32,
            a1: (a1 / a0) as f32,
            a2: (a2 / a0) as f32,
        }
    }

    /// Second-order low-pass section
    ///
    /// # Parameters
    /// - `sample_rate`: Audio sample rate in Hz
    /// - `freq`: Cutoff frequency in Hz
    /// - `q`: Q factor of the pole pair
    #[must_use]
    pub fn low_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let n = 1.0 / (PI * clamp_cutoff(freq, sample_rate) / sample_rate).tan();
        let n_squared = n * n;
        let inv_q = 1.0 / q;

        Self::from_raw(
            1.0,
            2.0,
            1.0,
            1.0 + inv_q * n + n_squared,
            2.0 * (1.0 - n_squared),
            1.0 - inv_q * n + n_squared,
        )
    }

    /// Second-order high-pass section
    #[must_use]
    pub fn high_pass(sample_rate: f64, freq: f64, q: f64) -> Self {
        let n = 1.0 / (PI * clamp_cutoff(freq, sample_rate) / sample_rate).tan();
        let n_squared = n * n;
        let inv_q = 1.0 / q;

        Self::from_raw(
            n_squared,
            -2.0 * n_squared,
            n_squared,
            1.0 + inv_q * n + n_squared,
            2.0 * (1.0 - n_squared),
            1.0 - inv_q * n + n_squared,
        )
    }

    /// Peaking EQ section
    ///
    /// Boosts or cuts frequencies around a center frequency. `gain` is a
    /// linear factor (use `decibels_to_gain` for dB values); a gain of 1.0
    /// yields the identity response.
    #[must_use]
    pub fn peak(sample_rate: f64, freq: f64, q: f64, gain: f64) -> Self {
        let a = gain.max(1.0e-9).sqrt();
        let w0 = 2.0 * PI * clamp_cutoff(freq, sample_rate) / sample_rate;
        let alpha = w0.sin() / (2.0 * q);
        let c2 = -2.0 * w0.cos();

        Self::from_raw(
            1.0 + alpha * a,
            c2,
            1.0 - alpha * a,
            1.0 + alpha / a,
            c2,
            1.0 - alpha / a,
        )
    }

    /// Complex frequency response at `freq` Hz
    ///
    /// Evaluates H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
    /// at z = e^(jw), w = 2*pi*freq/sample_rate.
    pub fn response(&self, freq: f64, sample_rate: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -2.0 * PI * freq / sample_rate);
        let z2 = z1 * z1;
        let num = f64::from(self.b0) + z1 * f64::from(self.b1) + z2 * f64::from(self.b2);
        let den = 1.0 + z1 * f64::from(self.a1) + z2 * f64::from(self.a2);
        num / den
    }

    /// Linear magnitude response at `freq` Hz
    pub fn magnitude_at(&self, freq: f64, sample_rate: f64) -> f64 {
        self.response(freq, sample_rate).norm()
    }
}

#[inline]
fn clamp_cutoff(freq: f64, sample_rate: f64) -> f64 {
    freq.clamp(MIN_DESIGN_FREQ, sample_rate * MAX_CUTOFF_RATIO)
}

// ============================================================================
// CASCADE DESIGN (high-order Butterworth)
// ============================================================================

/// Fixed-capacity set of cascaded sections returned by a cascade design
///
/// Lives on the stack so designs can run on the audio thread every block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeCoeffs {
    sections: [BiquadCoeffs; MAX_CASCADE_SECTIONS],
    len: usize,
}

impl CascadeCoeffs {
    pub fn as_slice(&self) -> &[BiquadCoeffs] {
        &self.sections[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn get(&self, index: usize) -> Option<&BiquadCoeffs> {
        self.as_slice().get(index)
    }
}

/// Q of the `index`-th pole pair of an even-order Butterworth filter
fn butterworth_q(order: usize, index: usize) -> f64 {
    1.0 / (2.0 * ((2 * index + 1) as f64 * PI / (2 * order) as f64).cos())
}

fn design_cascade(
    order: usize,
    section: impl Fn(f64) -> BiquadCoeffs,
) -> CascadeCoeffs {
    assert!(
        order >= 2 && order % 2 == 0 && order / 2 <= MAX_CASCADE_SECTIONS,
        "Butterworth cascade order must be one of 2, 4, 6, 8 (got {order})"
    );

    let mut sections = [BiquadCoeffs::identity(); MAX_CASCADE_SECTIONS];
    let len = order / 2;
    for (i, slot) in sections.iter_mut().take(len).enumerate() {
        *slot = section(butterworth_q(order, i));
    }
    CascadeCoeffs { sections, len }
}

/// Design an `order`-th order Butterworth low-pass as `order / 2` sections
///
/// # Panics
/// If `order` is not one of 2, 4, 6, 8.
pub fn design_low_pass(freq: f64, sample_rate: f64, order: usize) -> CascadeCoeffs {
    design_cascade(order, |q| BiquadCoeffs::low_pass(sample_rate, freq, q))
}

/// Design an `order`-th order Butterworth high-pass as `order / 2` sections
///
/// # Panics
/// If `order` is not one of 2, 4, 6, 8.
pub fn design_high_pass(freq: f64, sample_rate: f64, order: usize) -> CascadeCoeffs {
    design_cascade(order, |q| BiquadCoeffs::high_pass(sample_rate, freq, q))
}

// ============================================================================
// BIQUAD STAGE
// ============================================================================

/// Flush values below the normal range to zero so decaying tails never
/// reach denormals.
#[inline]
fn flush_denormal(x: f32) -> f32 {
    if x.abs() < f32::MIN_POSITIVE {
        0.0
    } else {
        x
    }
}

/// Bypassable biquad section using Direct Form I
///
/// Swapping coefficients never touches the delay line, so gradual parameter
/// changes between blocks stay click-free. A bypassed stage is an exact
/// identity and leaves its delay line untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiquadStage {
    coeffs: BiquadCoeffs,
    bypassed: bool,
    // Previous input samples (x[n-1], x[n-2])
    x1: f32,
    x2: f32,
    // Previous output samples (y[n-1], y[n-2])
    y1: f32,
    y2: f32,
}

impl Default for BiquadStage {
    fn default() -> Self {
        Self::new(BiquadCoeffs::identity())
    }
}

impl BiquadStage {
    /// Create an active stage with given coefficients
    pub fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            bypassed: false,
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    /// Replace the coefficients, keeping the delay line
    pub fn set_coefficients(&mut self, coeffs: BiquadCoeffs) {
        self.coeffs = coeffs;
    }

    pub fn coefficients(&self) -> &BiquadCoeffs {
        &self.coeffs
    }

    pub fn set_bypassed(&mut self, bypassed: bool) {
        self.bypassed = bypassed;
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed
    }

    /// Process a single sample
    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        if self.bypassed {
            return x;
        }

        // Direct Form I: y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2]
        //                        - a1*y[n-1] - a2*y[n-2]
        let c = &self.coeffs;
        let y = flush_denormal(
            c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2,
        );

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    /// Process a buffer of samples in-place
    pub fn process(&mut self, buffer: &mut [f32]) {
        if self.bypassed {
            return;
        }
        for sample in buffer.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }

    /// Clear the delay line
    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

// ============================================================================
// TESTS
// ============================================================================

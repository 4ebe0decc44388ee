//! Test signal generators for auditioning and offline rendering

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

/// Kind of test signal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TestSignal {
    /// Constant-frequency sine
    Sine { freq: f32 },
    /// Logarithmic sweep from `start` to `end` Hz, repeating every `duration_secs`
    Sweep {
        start: f32,
        end: f32,
        duration_secs: f32,
    },
    /// Uniform white noise
    WhiteNoise,
}

/// Mono sample source for a `TestSignal`
pub struct SignalGenerator {
    signal: TestSignal,
    sample_rate: f64,
    amplitude: f32,
    phase: f64,
    position: u64,
    rng: StdRng,
}

impl SignalGenerator {
    pub fn new(signal: TestSignal, sample_rate: u32, amplitude: f32) -> Self {
        Self::with_seed(signal, sample_rate, amplitude, rand::random())
    }

    /// Deterministic generator, for reproducible noise
    pub fn with_seed(signal: TestSignal, sample_rate: u32, amplitude: f32, seed: u64) -> Self {
        Self {
            signal,
            sample_rate: f64::from(sample_rate),
            amplitude: amplitude.clamp(0.0, 1.0),
            phase: 0.0,
            position: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn signal(&self) -> TestSignal {
        self.signal
    }

    /// Instantaneous frequency of a tonal signal at the current position
    fn frequency(&self) -> Option<f64> {
        match self.signal {
            TestSignal::Sine { freq } => Some(f64::from(freq)),
            TestSignal::Sweep {
                start,
                end,
                duration_secs,
            } => {
                let length = (f64::from(duration_secs) * self.sample_rate).max(1.0) as u64;
                let t = (self.position % length) as f64 / length as f64;
                let (start, end) = (f64::from(start).max(1.0), f64::from(end).max(1.0));
                Some(start * (end / start).powf(t))
            }
            TestSignal::WhiteNoise => None,
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let value = match self.frequency() {
            Some(freq) => {
                let value = self.phase.sin() as f32;
                self.phase = (self.phase + TAU * freq / self.sample_rate) % TAU;
                value
            }
            None => self.rng.gen_range(-1.0f32..=1.0),
        };

        self.position = self.position.wrapping_add(1);
        value * self.amplitude
    }

    /// Fill a mono buffer
    pub fn fill(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.next_sample();
        }
    }

    /// Fill an interleaved buffer, writing the same sample to every channel
    pub fn fill_interleaved(&mut self, buffer: &mut [f32], channels: usize) {
        for frame in buffer.chunks_mut(channels.max(1)) {
            frame.fill(self.next_sample());
        }
    }
}

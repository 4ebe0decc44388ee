//! Shared signal helpers for the SimpleEQ integration tests

use std::f32::consts::TAU;

pub fn generate_sine_wave(frequency: f32, sample_rate: u32, num_samples: usize) -> Vec<f32> {
    (0..num_samples)
        .map(|i| (TAU * frequency * i as f32 / sample_rate as f32).sin())
        .collect()
}

pub fn generate_impulse(num_samples: usize) -> Vec<f32> {
    let mut buffer = vec![0.0; num_samples];
    if let Some(first) = buffer.first_mut() {
        *first = 1.0;
    }
    buffer
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

pub fn all_finite(samples: &[f32]) -> bool {
    samples.iter().all(|s| s.is_finite())
}

//! Offline rendering of WAV files through the equalizer
//!
//! Input is read and processed one block at a time, exactly as a host would
//! deliver it. Output is always stereo 32-bit float at the input's sample
//! rate. A mono input fills only the left channel; the right output channel
//! carries silence.

use crate::signal::SignalGenerator;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use simpleeq_core::domain::audio::{AudioBuffer, AudioError, ChannelCount, Result};
use simpleeq_core::domain::params::ParameterStore;
use simpleeq_core::domain::processor::{EqProcessor, ProcessSpec};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const OUTPUT_CHANNELS: u16 = 2;

/// Summary of a finished render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub frames: u64,
    pub input_channels: u16,
    pub sample_rate: u32,
}

fn file_error(e: hound::Error) -> AudioError {
    AudioError::FileError(e.to_string())
}

fn output_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: OUTPUT_CHANNELS,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}

/// Render `input` through the EQ into `output`
pub fn render_file(
    input: &Path,
    output: &Path,
    params: Arc<ParameterStore>,
    block_size: usize,
) -> Result<RenderReport> {
    let reader = WavReader::open(input).map_err(file_error)?;
    let spec = reader.spec();

    let input_layout = ChannelCount::from_count(spec.channels);
    if !EqProcessor::is_layout_supported(input_layout, ChannelCount::Stereo) {
        return Err(AudioError::UnsupportedConfiguration(format!(
            "{} input channels, mono or stereo required",
            spec.channels
        )));
    }

    info!(
        input = %input.display(),
        output = %output.display(),
        channels = spec.channels,
        sample_rate = spec.sample_rate,
        "Rendering file"
    );

    let mut samples: Box<dyn Iterator<Item = hound::Result<f32>>> = match spec.sample_format {
        SampleFormat::Float => Box::new(reader.into_samples::<f32>()),
        SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample - 1)) as f32;
            Box::new(
                reader
                    .into_samples::<i32>()
                    .map(move |s| s.map(|v| v as f32 * scale)),
            )
        }
    };

    let input_channels = usize::from(spec.channels);
    let mut eq = EqProcessor::new(params);
    eq.prepare(ProcessSpec::new(f64::from(spec.sample_rate), block_size))?;

    let mut writer = WavWriter::create(output, output_spec(spec.sample_rate)).map_err(file_error)?;
    let mut buffer = AudioBuffer::new(usize::from(OUTPUT_CHANNELS), block_size);
    let mut interleaved_in = Vec::with_capacity(block_size * input_channels);
    let mut interleaved_out = vec![0.0f32; block_size * usize::from(OUTPUT_CHANNELS)];
    let mut frames = 0u64;

    loop {
        interleaved_in.clear();
        for sample in samples.by_ref().take(block_size * input_channels) {
            interleaved_in.push(sample.map_err(file_error)?);
        }
        if interleaved_in.is_empty() {
            break;
        }

        buffer.load_interleaved(&interleaved_in, input_channels)?;
        eq.process_block(&mut buffer, input_channels)?;

        let written = buffer.store_interleaved(&mut interleaved_out);
        for &sample in &interleaved_out[..written] {
            writer.write_sample(sample).map_err(file_error)?;
        }
        frames += buffer.len() as u64;
    }

    writer.finalize().map_err(file_error)?;
    eq.release();

    debug!(frames, "Render finished");
    Ok(RenderReport {
        frames,
        input_channels: spec.channels,
        sample_rate: spec.sample_rate,
    })
}

/// Render `frames` of a generated mono signal through the EQ into `output`
pub fn render_signal(
    generator: &mut SignalGenerator,
    output: &Path,
    params: Arc<ParameterStore>,
    sample_rate: u32,
    frames: u64,
    block_size: usize,
) -> Result<RenderReport> {
    info!(
        output = %output.display(),
        signal = ?generator.signal(),
        frames,
        "Rendering test signal"
    );

    let mut eq = EqProcessor::new(params);
    eq.prepare(ProcessSpec::new(f64::from(sample_rate), block_size))?;

    let mut writer = WavWriter::create(output, output_spec(sample_rate)).map_err(file_error)?;
    let mut buffer = AudioBuffer::new(usize::from(OUTPUT_CHANNELS), block_size);
    let mut interleaved_out = vec![0.0f32; block_size * usize::from(OUTPUT_CHANNELS)];
    let mut remaining = frames;

    while remaining > 0 {
        let len = remaining.min(block_size as u64) as usize;
        buffer.set_len(len)?;

        // Same tone on both inputs
        if let Some((left, right)) = buffer.stereo_mut() {
            generator.fill(left);
            right.copy_from_slice(left);
        }

        eq.process_block(&mut buffer, usize::from(OUTPUT_CHANNELS))?;

        let written = buffer.store_interleaved(&mut interleaved_out);
        for &sample in &interleaved_out[..written] {
            writer.write_sample(sample).map_err(file_error)?;
        }
        remaining -= len as u64;
    }

    writer.finalize().map_err(file_error)?;
    eq.release();

    Ok(RenderReport {
        frames,
        input_channels: OUTPUT_CHANNELS,
        sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::TestSignal;
    use simpleeq_core::domain::chain::Slope;
    use simpleeq_core::domain::params::ParamId;
    use std::f32::consts::TAU;
    use tempfile::TempDir;

    fn write_sine(path: &Path, channels: u16, sample_rate: u32, freq: f32, frames: usize) {
        let spec = WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(path, spec).unwrap();
        for n in 0..frames {
            let value = (TAU * freq * n as f32 / sample_rate as f32).sin() * 0.5;
            for _ in 0..channels {
                writer.write_sample((value * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    fn read_stereo(path: &Path) -> (WavSpec, Vec<f32>, Vec<f32>) {
        let mut reader = WavReader::open(path).unwrap();
        let spec = reader.spec();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        let left = samples.iter().step_by(2).copied().collect();
        let right = samples.iter().skip(1).step_by(2).copied().collect();
        (spec, left, right)
    }

    fn rms(samples: &[f32]) -> f32 {
        (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
    }

    #[test]
    fn test_mono_input_gives_silent_right_channel() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("mono.wav");
        let output = dir.path().join("out.wav");
        write_sine(&input, 1, 44100, 1000.0, 10_000);

        let report = render_file(&input, &output, Arc::new(ParameterStore::new()), 512).unwrap();
        assert_eq!(report.frames, 10_000);
        assert_eq!(report.input_channels, 1);

        let (spec, left, right) = read_stereo(&output);
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.sample_rate, 44100);
        assert_eq!(left.len(), 10_000);
        assert!(right.iter().all(|&s| s == 0.0));
        assert!(rms(&left) > 0.3);
    }

    #[test]
    fn test_flat_settings_pass_midrange() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("stereo.wav");
        let output = dir.path().join("out.wav");
        write_sine(&input, 2, 48000, 1000.0, 48_000);

        render_file(&input, &output, Arc::new(ParameterStore::new()), 256).unwrap();

        let (_, left, right) = read_stereo(&output);
        let expected = 0.5 / 2f32.sqrt();
        // Skip the filter settling time
        assert!((rms(&left[4800..]) - expected).abs() < 0.01);
        assert!((rms(&right[4800..]) - expected).abs() < 0.01);
    }

    #[test]
    fn test_low_cut_attenuates_bass() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("bass.wav");
        let output = dir.path().join("out.wav");
        write_sine(&input, 2, 48000, 50.0, 48_000);

        let params = Arc::new(ParameterStore::new());
        params.set(ParamId::LowCutFreq, 400.0).unwrap();
        params.set_low_cut_slope(Slope::Db48);

        render_file(&input, &output, params, 512).unwrap();

        let (_, left, _) = read_stereo(&output);
        assert!(rms(&left[9600..]) < 0.001);
    }

    #[test]
    fn test_rejects_multichannel_input() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("surround.wav");
        write_sine(&input, 6, 48000, 1000.0, 64);

        let output = dir.path().join("out.wav");
        let result = render_file(&input, &output, Arc::new(ParameterStore::new()), 64);
        assert!(matches!(result, Err(AudioError::UnsupportedConfiguration(_))));
    }

    #[test]
    fn test_missing_input_is_file_error() {
        let dir = TempDir::new().unwrap();
        let result = render_file(
            &dir.path().join("missing.wav"),
            &dir.path().join("out.wav"),
            Arc::new(ParameterStore::new()),
            64,
        );
        assert!(matches!(result, Err(AudioError::FileError(_))));
    }

    #[test]
    fn test_render_signal_length() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("noise.wav");
        let mut generator = SignalGenerator::with_seed(TestSignal::WhiteNoise, 48000, 0.25, 3);

        let report = render_signal(
            &mut generator,
            &output,
            Arc::new(ParameterStore::new()),
            48000,
            1000,
            300,
        )
        .unwrap();
        assert_eq!(report.frames, 1000);

        let (_, left, right) = read_stereo(&output);
        assert_eq!(left.len(), 1000);
        assert_eq!(left, right);
    }
}

//! The equalizer processor: host-facing lifecycle around a `StereoChain`
//!
//! Per block the processor snapshots the parameter store, recomputes every
//! coefficient set and stage topology, then runs the samples. Design work
//! happens before the first sample of the block is touched, so a block is
//! always filtered with one consistent set of coefficients.

use crate::domain::audio::{AudioBuffer, AudioError, ChannelCount, Result, StreamConfig};
use crate::domain::chain::StereoChain;
use crate::domain::dsp::{gain_to_decibels, Effect};
use crate::domain::params::{ChainSettings, ParameterStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Sample rate and block size the host will run at
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSpec {
    pub sample_rate: f64,
    pub maximum_block_size: usize,
}

impl ProcessSpec {
    pub fn new(sample_rate: f64, maximum_block_size: usize) -> Self {
        Self {
            sample_rate,
            maximum_block_size,
        }
    }
}

impl From<&StreamConfig> for ProcessSpec {
    fn from(config: &StreamConfig) -> Self {
        Self {
            sample_rate: f64::from(config.sample_rate.hz()),
            maximum_block_size: config.buffer_size as usize,
        }
    }
}

/// Three-band equalizer with stereo in/out
pub struct EqProcessor {
    params: Arc<ParameterStore>,
    chain: StereoChain,
    spec: Option<ProcessSpec>,
}

impl EqProcessor {
    pub const NAME: &'static str = "SimpleEQ";

    pub fn new(params: Arc<ParameterStore>) -> Self {
        Self {
            params,
            chain: StereoChain::new(),
            spec: None,
        }
    }

    /// Shared parameter store written by the control side
    pub fn params(&self) -> &Arc<ParameterStore> {
        &self.params
    }

    pub fn chain(&self) -> &StereoChain {
        &self.chain
    }

    pub fn spec(&self) -> Option<ProcessSpec> {
        self.spec
    }

    pub fn is_prepared(&self) -> bool {
        self.spec.is_some()
    }

    /// Get ready to process at `spec.sample_rate`
    ///
    /// Clears every delay line and designs the initial coefficients and
    /// topology from the current parameter values.
    pub fn prepare(&mut self, spec: ProcessSpec) -> Result<()> {
        if !(spec.sample_rate.is_finite() && spec.sample_rate > 0.0) {
            return Err(AudioError::InvalidConfiguration(format!(
                "sample rate must be positive (got {})",
                spec.sample_rate
            )));
        }
        if spec.maximum_block_size == 0 {
            return Err(AudioError::InvalidConfiguration(
                "maximum block size must be non-zero".to_string(),
            ));
        }

        self.chain.reset();
        let settings = self.params.capture_settings();
        self.chain.update_all_filters(&settings, spec.sample_rate);
        self.spec = Some(spec);

        info!(
            sample_rate = spec.sample_rate,
            block_size = spec.maximum_block_size,
            "EQ prepared"
        );
        debug!(?settings, "Initial EQ settings");
        Ok(())
    }

    /// Stop processing; `prepare` must be called again before the next block
    pub fn release(&mut self) {
        if self.spec.take().is_some() {
            info!("EQ released");
        }
    }

    /// Accepted channel layouts: stereo out, mono or stereo in
    pub fn is_layout_supported(input: ChannelCount, output: ChannelCount) -> bool {
        output == ChannelCount::Stereo && matches!(input, ChannelCount::Mono | ChannelCount::Stereo)
    }

    pub fn tail_length_seconds(&self) -> f64 {
        0.0
    }

    fn sample_rate(&self) -> Result<f64> {
        self.spec
            .map(|spec| spec.sample_rate)
            .ok_or(AudioError::NotPrepared)
    }

    /// Snapshot the parameters and redesign every band
    pub fn update_filters(&mut self) -> Result<ChainSettings> {
        let sample_rate = self.sample_rate()?;
        let settings = self.params.capture_settings();
        self.chain.update_all_filters(&settings, sample_rate);
        Ok(settings)
    }

    /// Process one planar block in place
    ///
    /// Output channels at or above `num_input_channels` carry garbage from
    /// the host and are cleared before filtering. Only the first two
    /// channels are filtered.
    pub fn process_block(
        &mut self,
        buffer: &mut AudioBuffer,
        num_input_channels: usize,
    ) -> Result<()> {
        let sample_rate = self.sample_rate()?;

        if buffer.num_channels() < 2 {
            return Err(AudioError::InvalidConfiguration(format!(
                "stereo buffer required (got {} channels)",
                buffer.num_channels()
            )));
        }

        for channel in num_input_channels..buffer.num_channels() {
            buffer.clear_channel(channel);
        }

        let settings = self.params.capture_settings();
        self.chain.update_all_filters(&settings, sample_rate);

        if let Some((left, right)) = buffer.stereo_mut() {
            self.chain.process(left, right);
        }
        Ok(())
    }

    /// Magnitude response in dB of the current chain at each frequency
    pub fn magnitude_response(&self, frequencies: &[f64]) -> Result<Vec<f64>> {
        let sample_rate = self.sample_rate()?;
        let mono = self.chain.left();

        Ok(frequencies
            .iter()
            .map(|&freq| f64::from(gain_to_decibels(mono.magnitude_at(freq, sample_rate) as f32)))
            .collect())
    }
}

impl Effect for EqProcessor {
    /// Process interleaved stereo frames in place
    fn process(&mut self, buffer: &mut [f32]) -> Result<()> {
        if buffer.len() % 2 != 0 {
            return Err(AudioError::InvalidConfiguration(format!(
                "interleaved stereo buffer has odd length {}",
                buffer.len()
            )));
        }

        self.update_filters()?;

        for frame in buffer.chunks_exact_mut(2) {
            let (left, right) = self.chain.process_frame(frame[0], frame[1]);
            frame[0] = left;
            frame[1] = right;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.chain.reset();
    }

    fn name(&self) -> &str {
        Self::NAME
    }
}

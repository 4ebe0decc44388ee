//! Live audition: a CPAL output stream playing a test signal through the EQ
//!
//! The processor and the signal generator are moved into the device
//! callback. The control side keeps the shared `ParameterStore` and writes
//! to it while the stream runs; the callback picks changes up on its next
//! block.

use crate::audio::device::CpalEnumerator;
use crate::signal::{SignalGenerator, TestSignal};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Stream, StreamConfig as CpalStreamConfig};
use simpleeq_core::domain::audio::{AudioError, ChannelCount, DeviceId, Result, StreamConfig};
use simpleeq_core::domain::dsp::Effect;
use simpleeq_core::domain::params::ParameterStore;
use simpleeq_core::domain::processor::{EqProcessor, ProcessSpec};
use std::sync::Arc;
use tracing::{error, info};

/// What to play and how loud
#[derive(Debug, Clone, Copy)]
pub struct AuditionSource {
    pub signal: TestSignal,
    pub amplitude: f32,
}

/// Running output stream
pub struct EqOutputStream {
    stream: Stream,
    config: StreamConfig,
    device_name: String,
}

impl EqOutputStream {
    /// Open `device` (or the default output) and start playing
    pub fn start(
        enumerator: &CpalEnumerator,
        device: Option<&DeviceId>,
        config: &StreamConfig,
        params: Arc<ParameterStore>,
        source: AuditionSource,
    ) -> Result<Self> {
        if !EqProcessor::is_layout_supported(ChannelCount::Mono, config.channels) {
            return Err(AudioError::UnsupportedConfiguration(format!(
                "{} output channels, stereo required",
                config.channels.count()
            )));
        }

        let cpal_device = enumerator.find_output_device(device)?;
        #[allow(deprecated)]
        let device_name = cpal_device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());

        info!(
            device = %device_name,
            sample_rate = config.sample_rate.hz(),
            buffer_size = config.buffer_size,
            "Creating output stream"
        );

        let mut eq = EqProcessor::new(params);
        eq.prepare(ProcessSpec::from(config))?;

        let mut generator =
            SignalGenerator::new(source.signal, config.sample_rate.hz(), source.amplitude);
        let channels = usize::from(config.channels.count());

        let cpal_config = CpalStreamConfig {
            channels: config.channels.count(),
            sample_rate: config.sample_rate.hz(),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let stream = cpal_device
            .build_output_stream(
                &cpal_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    generator.fill_interleaved(data, channels);
                    if let Err(e) = eq.process(data) {
                        data.fill(0.0);
                        error!("EQ processing error: {}", e);
                    }
                },
                |err| error!("Output stream error: {}", err),
                None,
            )
            .map_err(|e| AudioError::StreamError(format!("Failed to build stream: {}", e)))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamError(format!("Failed to start stream: {}", e)))?;

        info!(device = %device_name, "Output stream started");

        Ok(Self {
            stream,
            config: config.clone(),
            device_name,
        })
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pause and close the stream
    pub fn stop(self) -> Result<()> {
        self.stream
            .pause()
            .map_err(|e| AudioError::StreamError(format!("Failed to pause stream: {}", e)))?;
        info!(device = %self.device_name, "Output stream stopped");
        Ok(())
    }
}

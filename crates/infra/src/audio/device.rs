//! CPAL-based output device enumeration

use cpal::traits::{DeviceTrait, HostTrait};
use simpleeq_core::domain::audio::{
    AudioEnumerator, AudioError, ChannelCount, DeviceId, DeviceInfo, Result, SampleRate,
};
use tracing::{debug, info, warn};

/// Describe a CPAL output device in domain terms
pub fn describe_output_device(device: &cpal::Device) -> Result<DeviceInfo> {
    #[allow(deprecated)]
    let name = device
        .name()
        .map_err(|e| AudioError::OsError(e.to_string()))?;

    let configs = device
        .supported_output_configs()
        .map_err(|e| AudioError::UnsupportedConfiguration(format!("{name}: {e}")))?;

    let mut sample_rates = Vec::new();
    let mut channel_counts = Vec::new();

    for config in configs {
        // Advertise the common rates that fall inside each supported range
        for hz in [44100, 48000, 88200, 96000, 192000] {
            if (config.min_sample_rate()..=config.max_sample_rate()).contains(&hz) {
                sample_rates.push(SampleRate::from_hz(hz));
            }
        }
        channel_counts.push(ChannelCount::from_count(config.channels()));
    }

    sample_rates.sort_by_key(|sr| sr.hz());
    sample_rates.dedup_by_key(|sr| sr.hz());
    channel_counts.sort_by_key(|cc| cc.count());
    channel_counts.dedup_by_key(|cc| cc.count());

    let default_sample_rate = device
        .default_output_config()
        .ok()
        .map(|config| SampleRate::from_hz(config.sample_rate()));

    debug!(device = %name, "Described output device");

    Ok(DeviceInfo {
        // Use name as ID, CPAL has no stable cross-platform identifier
        id: DeviceId::new(name.clone()),
        name,
        sample_rates,
        channel_counts,
        default_sample_rate,
    })
}

/// CPAL-based output device enumerator
pub struct CpalEnumerator {
    host: cpal::Host,
}

impl Default for CpalEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalEnumerator {
    pub fn new() -> Self {
        let host = cpal::default_host();
        info!("Using audio host: {:?}", host.id());
        Self { host }
    }

    /// Resolve a device by ID, or the default output device for `None`
    pub fn find_output_device(&self, id: Option<&DeviceId>) -> Result<cpal::Device> {
        let Some(id) = id else {
            return self
                .host
                .default_output_device()
                .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()));
        };

        #[allow(deprecated)]
        let device = self
            .host
            .output_devices()
            .map_err(|e| AudioError::OsError(e.to_string()))?
            .find(|d| d.name().ok().as_deref() == Some(id.as_str()));

        device.ok_or_else(|| AudioError::DeviceNotFound(id.as_str().to_string()))
    }
}

impl AudioEnumerator for CpalEnumerator {
    fn output_devices(&self) -> Result<Vec<DeviceInfo>> {
        let cpal_devices = self
            .host
            .output_devices()
            .map_err(|e| AudioError::OsError(e.to_string()))?;

        let mut devices = Vec::new();
        for device in cpal_devices {
            match describe_output_device(&device) {
                Ok(info) => devices.push(info),
                Err(e) => warn!("Skipping device due to error: {}", e),
            }
        }

        info!("Found {} output devices", devices.len());
        Ok(devices)
    }

    fn default_output_device(&self) -> Result<DeviceInfo> {
        let device = self.find_output_device(None)?;
        describe_output_device(&device)
    }
}

//! Audio stream abstractions and domain models
//!
//! This module defines the platform-agnostic audio types shared by the
//! processor and by the host implementations in the `infra` crate:
//! errors, sample rates, channel layouts, device descriptions and the
//! planar `AudioBuffer` handed to `EqProcessor::process_block`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the audio subsystem
#[derive(Debug, Error)]
pub enum AudioError {
    /// Requested audio device was not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Error in audio stream creation or processing
    #[error("Stream error: {0}")]
    StreamError(String),

    /// Invalid configuration for audio device or buffer
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Input/Output error at the OS level
    #[error("OS error: {0}")]
    OsError(String),

    /// Device does not support the requested configuration
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// A block was submitted before `prepare` established the filter state
    #[error("Processor used before prepare()")]
    NotPrepared,

    /// Reading or writing an audio file failed
    #[error("File error: {0}")]
    FileError(String),
}

pub type Result<T> = std::result::Result<T, AudioError>;

/// Unique identifier for an audio device
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Audio sample rate in Hz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleRate {
    Hz44100,
    Hz48000,
    Hz88200,
    Hz96000,
    Hz192000,
    Custom(u32),
}

impl SampleRate {
    pub fn hz(&self) -> u32 {
        match self {
            SampleRate::Hz44100 => 44100,
            SampleRate::Hz48000 => 48000,
            SampleRate::Hz88200 => 88200,
            SampleRate::Hz96000 => 96000,
            SampleRate::Hz192000 => 192000,
            SampleRate::Custom(hz) => *hz,
        }
    }

    pub fn from_hz(hz: u32) -> Self {
        match hz {
            44100 => SampleRate::Hz44100,
            48000 => SampleRate::Hz48000,
            88200 => SampleRate::Hz88200,
            96000 => SampleRate::Hz96000,
            192000 => SampleRate::Hz192000,
            hz => SampleRate::Custom(hz),
        }
    }
}

/// Number of audio channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelCount {
    Mono,
    Stereo,
    Surround(u16),
}

impl ChannelCount {
    pub fn count(&self) -> u16 {
        match self {
            ChannelCount::Mono => 1,
            ChannelCount::Stereo => 2,
            ChannelCount::Surround(n) => *n,
        }
    }

    pub fn from_count(n: u16) -> Self {
        match n {
            1 => ChannelCount::Mono,
            2 => ChannelCount::Stereo,
            n => ChannelCount::Surround(n),
        }
    }
}

/// Configuration for an audio stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub sample_rate: SampleRate,
    pub channels: ChannelCount,
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: SampleRate::Hz48000,
            channels: ChannelCount::Stereo,
            buffer_size: 512,
        }
    }
}

/// Information about an audio device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub id: DeviceId,
    pub name: String,
    pub sample_rates: Vec<SampleRate>,
    pub channel_counts: Vec<ChannelCount>,
    pub default_sample_rate: Option<SampleRate>,
}

/// Trait for enumerating the devices an equalized signal can be played on
pub trait AudioEnumerator: Send + Sync {
    /// Get all output devices
    fn output_devices(&self) -> Result<Vec<DeviceInfo>>;

    /// Get the default output device
    fn default_output_device(&self) -> Result<DeviceInfo>;
}

/// Planar multichannel sample buffer
///
/// Storage is allocated once with a fixed capacity per channel; the number
/// of valid frames can shrink and grow within that capacity so a host can
/// reuse the same buffer for blocks of varying length without allocating.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    channels: Vec<Vec<f32>>,
    len: usize,
}

impl AudioBuffer {
    /// Create a zeroed buffer with `num_channels` channels of `capacity` frames
    pub fn new(num_channels: usize, capacity: usize) -> Self {
        Self {
            channels: vec![vec![0.0; capacity]; num_channels],
            len: capacity,
        }
    }

    /// Build a buffer from per-channel sample vectors of equal length
    pub fn from_channels(channels: Vec<Vec<f32>>) -> Result<Self> {
        let len = channels.first().map(Vec::len).unwrap_or(0);
        if channels.iter().any(|ch| ch.len() != len) {
            return Err(AudioError::InvalidConfiguration(
                "All channels must have the same length".to_string(),
            ));
        }
        Ok(Self { channels, len })
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of valid frames
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of frames without reallocation
    pub fn capacity(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    /// Change the number of valid frames (must not exceed capacity)
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.capacity() {
            return Err(AudioError::InvalidConfiguration(format!(
                "Block of {} frames exceeds buffer capacity {}",
                len,
                self.capacity()
            )));
        }
        self.len = len;
        Ok(())
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|ch| &ch[..self.len])
    }

    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let len = self.len;
        self.channels.get_mut(index).map(|ch| &mut ch[..len])
    }

    /// Borrow the first two channels mutably at the same time
    pub fn stereo_mut(&mut self) -> Option<(&mut [f32], &mut [f32])> {
        let len = self.len;
        match self.channels.as_mut_slice() {
            [left, right, ..] => Some((&mut left[..len], &mut right[..len])),
            _ => None,
        }
    }

    /// Fill one channel with silence
    pub fn clear_channel(&mut self, index: usize) {
        if let Some(ch) = self.channel_mut(index) {
            ch.fill(0.0);
        }
    }

    /// Deinterleave `src` into this buffer and set the frame count
    ///
    /// `src_channels` may be smaller than the buffer's channel count, in
    /// which case the remaining channels are left untouched.
    pub fn load_interleaved(&mut self, src: &[f32], src_channels: usize) -> Result<()> {
        if src_channels == 0 || src_channels > self.num_channels() {
            return Err(AudioError::InvalidConfiguration(format!(
                "Cannot load {} interleaved channels into a {}-channel buffer",
                src_channels,
                self.num_channels()
            )));
        }
        let frames = src.len() / src_channels;
        self.set_len(frames)?;
        for (frame, samples) in src.chunks_exact(src_channels).enumerate() {
            for (ch, &sample) in samples.iter().enumerate() {
                self.channels[ch][frame] = sample;
            }
        }
        Ok(())
    }

    /// Interleave the valid frames of all channels into `dst`
    ///
    /// Returns the number of samples written.
    pub fn store_interleaved(&self, dst: &mut [f32]) -> usize {
        let num_channels = self.num_channels();
        if num_channels == 0 {
            return 0;
        }
        let frames = self.len.min(dst.len() / num_channels);
        for frame in 0..frames {
            for ch in 0..num_channels {
                dst[frame * num_channels + ch] = self.channels[ch][frame];
            }
        }
        frames * num_channels
    }
}

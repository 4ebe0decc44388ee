//! Domain entities and business rules

pub mod audio;
pub mod chain;
pub mod config;
pub mod dsp;
pub mod params;
pub mod processor;

// Re-export specific items to avoid ambiguous glob imports
pub use audio::{
    AudioBuffer, AudioEnumerator, AudioError, ChannelCount, DeviceId, DeviceInfo, SampleRate,
    StreamConfig,
};
pub use chain::{FilterBank, MonoChain, Slope, StereoChain, MAX_CUT_STAGES};
pub use config::{AudioConfig, ConfigError, ConfigManager, ConfigWatcher, EqConfig};
pub use dsp::{
    decibels_to_gain, design_high_pass, design_low_pass, BiquadCoeffs, BiquadStage,
    CascadeCoeffs, Effect,
};
pub use params::{ChainSettings, NormalisableRange, ParamError, ParamId, ParameterStore};
pub use processor::{EqProcessor, ProcessSpec};

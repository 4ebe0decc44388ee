//! Output device support using CPAL
//!
//! CPAL abstracts the platform-specific APIs:
//! - Windows: WASAPI
//! - Linux: ALSA/PulseAudio
//! - macOS: CoreAudio

pub mod device;
pub mod stream;

pub use device::*;
pub use stream::*;

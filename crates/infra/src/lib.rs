//! Host-side plumbing for the SimpleEQ processor
//!
//! - `audio`: output device enumeration and live audition via CPAL
//! - `render`: offline WAV rendering via hound
//! - `signal`: test signal generators

pub mod audio;
pub mod render;
pub mod signal;

pub use audio::{AuditionSource, CpalEnumerator, EqOutputStream};
pub use render::{render_file, render_signal, RenderReport};
pub use signal::{SignalGenerator, TestSignal};

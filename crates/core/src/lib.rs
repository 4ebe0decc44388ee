//! SimpleEQ core: the real-time filter chain of a three-band parametric EQ
//!
//! The crate is organised around the `domain` module, which holds the
//! biquad primitives, the cut-filter topology, the lock-free parameter
//! store and the block-processing entry point.

pub mod domain;

pub use domain::*;

//! Control parameters shared between the audio thread and everything else
//!
//! `ParameterStore` holds one atomic cell per parameter. Any thread may write
//! through an `Arc<ParameterStore>`; the audio thread reads a full
//! `ChainSettings` snapshot once per block with `capture_settings`. Reads and
//! writes never block.

use crate::domain::chain::Slope;
use crossbeam::atomic::AtomicCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from writing or looking up parameters
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParamError {
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Invalid choice {index} for {param} (expected 0..={max})")]
    InvalidChoice { param: ParamId, index: i64, max: usize },

    #[error("Non-finite value for {0}")]
    NonFinite(ParamId),
}

// ============================================================================
// SETTINGS SNAPSHOT
// ============================================================================

/// Plain snapshot of every control parameter, taken once per block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainSettings {
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_quality: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            low_cut_freq: 20.0,
            high_cut_freq: 20000.0,
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_quality: 1.0,
            low_cut_slope: Slope::Db12,
            high_cut_slope: Slope::Db12,
        }
    }
}

// ============================================================================
// RANGES
// ============================================================================

/// Value range with a step size and a skew for host-normalised mapping
///
/// `skew < 1` gives more of the normalised range to low values, which is
/// what frequency controls want.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalisableRange {
    pub start: f32,
    pub end: f32,
    pub interval: f32,
    pub skew: f32,
}

impl NormalisableRange {
    pub const fn new(start: f32, end: f32, interval: f32, skew: f32) -> Self {
        Self {
            start,
            end,
            interval,
            skew,
        }
    }

    /// Map a plain value into [0, 1]
    pub fn convert_to_normalised(&self, value: f32) -> f32 {
        let span = f64::from(self.end) - f64::from(self.start);
        let proportion = ((f64::from(value) - f64::from(self.start)) / span).clamp(0.0, 1.0);

        if self.skew == 1.0 {
            proportion as f32
        } else {
            proportion.powf(f64::from(self.skew)) as f32
        }
    }

    /// Map a value in [0, 1] back into the plain range
    pub fn convert_from_normalised(&self, normalised: f32) -> f32 {
        let mut proportion = f64::from(normalised).clamp(0.0, 1.0);

        if self.skew != 1.0 && proportion > 0.0 {
            proportion = (proportion.ln() / f64::from(self.skew)).exp();
        }

        let span = f64::from(self.end) - f64::from(self.start);
        (f64::from(self.start) + span * proportion) as f32
    }

    /// Round to the nearest interval step and clamp into the range
    pub fn snap_to_legal_value(&self, value: f32) -> f32 {
        let start = f64::from(self.start);
        let mut v = f64::from(value);

        if self.interval > 0.0 {
            let interval = f64::from(self.interval);
            v = start + interval * ((v - start) / interval + 0.5).floor();
        }

        (v as f32).clamp(self.start, self.end)
    }

    pub fn contains(&self, value: f32) -> bool {
        (self.start..=self.end).contains(&value)
    }
}

pub const FREQUENCY_RANGE: NormalisableRange = NormalisableRange::new(20.0, 20000.0, 1.0, 0.25);
pub const GAIN_RANGE: NormalisableRange = NormalisableRange::new(-24.0, 24.0, 0.5, 1.0);
pub const QUALITY_RANGE: NormalisableRange = NormalisableRange::new(0.1, 10.0, 0.05, 1.0);

// ============================================================================
// PARAMETER IDS
// ============================================================================

/// The seven automatable parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamId {
    LowCutFreq,
    HighCutFreq,
    PeakFreq,
    PeakGain,
    PeakQuality,
    LowCutSlope,
    HighCutSlope,
}

impl ParamId {
    pub const ALL: [ParamId; 7] = [
        ParamId::LowCutFreq,
        ParamId::HighCutFreq,
        ParamId::PeakFreq,
        ParamId::PeakGain,
        ParamId::PeakQuality,
        ParamId::LowCutSlope,
        ParamId::HighCutSlope,
    ];

    /// Stable identifier, also the key used in config files
    pub fn id(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "low_cut_freq",
            ParamId::HighCutFreq => "high_cut_freq",
            ParamId::PeakFreq => "peak_freq",
            ParamId::PeakGain => "peak_gain_db",
            ParamId::PeakQuality => "peak_quality",
            ParamId::LowCutSlope => "low_cut_slope",
            ParamId::HighCutSlope => "high_cut_slope",
        }
    }

    /// Display name
    pub fn name(self) -> &'static str {
        match self {
            ParamId::LowCutFreq => "LowCut Freq",
            ParamId::HighCutFreq => "HighCut Freq",
            ParamId::PeakFreq => "Peak Freq",
            ParamId::PeakGain => "Peak Gain",
            ParamId::PeakQuality => "Peak Quality",
            ParamId::LowCutSlope => "LowCut Slope",
            ParamId::HighCutSlope => "HighCut Slope",
        }
    }

    pub fn is_choice(self) -> bool {
        matches!(self, ParamId::LowCutSlope | ParamId::HighCutSlope)
    }

    /// Declared range of a float parameter, `None` for choices
    pub fn range(self) -> Option<NormalisableRange> {
        match self {
            ParamId::LowCutFreq | ParamId::HighCutFreq | ParamId::PeakFreq => Some(FREQUENCY_RANGE),
            ParamId::PeakGain => Some(GAIN_RANGE),
            ParamId::PeakQuality => Some(QUALITY_RANGE),
            ParamId::LowCutSlope | ParamId::HighCutSlope => None,
        }
    }

    /// Labels of a choice parameter, `None` for floats
    pub fn choice_labels(self) -> Option<[&'static str; 4]> {
        self.is_choice().then(|| Slope::ALL.map(Slope::label))
    }

    /// Default plain value (choice index for slopes)
    pub fn default_value(self) -> f32 {
        let defaults = ChainSettings::default();
        match self {
            ParamId::LowCutFreq => defaults.low_cut_freq,
            ParamId::HighCutFreq => defaults.high_cut_freq,
            ParamId::PeakFreq => defaults.peak_freq,
            ParamId::PeakGain => defaults.peak_gain_db,
            ParamId::PeakQuality => defaults.peak_quality,
            ParamId::LowCutSlope => defaults.low_cut_slope.index() as f32,
            ParamId::HighCutSlope => defaults.high_cut_slope.index() as f32,
        }
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for ParamId {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.id() == s)
            .ok_or_else(|| ParamError::UnknownParameter(s.to_string()))
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Lock-free parameter storage
///
/// Float values are clamped into their declared range and snapped to its
/// interval on write, so the audio thread only ever sees legal values.
#[derive(Debug)]
pub struct ParameterStore {
    low_cut_freq: AtomicCell<f32>,
    high_cut_freq: AtomicCell<f32>,
    peak_freq: AtomicCell<f32>,
    peak_gain_db: AtomicCell<f32>,
    peak_quality: AtomicCell<f32>,
    low_cut_slope: AtomicCell<Slope>,
    high_cut_slope: AtomicCell<Slope>,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    /// Create a store holding the default settings
    pub fn new() -> Self {
        let defaults = ChainSettings::default();
        Self {
            low_cut_freq: AtomicCell::new(defaults.low_cut_freq),
            high_cut_freq: AtomicCell::new(defaults.high_cut_freq),
            peak_freq: AtomicCell::new(defaults.peak_freq),
            peak_gain_db: AtomicCell::new(defaults.peak_gain_db),
            peak_quality: AtomicCell::new(defaults.peak_quality),
            low_cut_slope: AtomicCell::new(defaults.low_cut_slope),
            high_cut_slope: AtomicCell::new(defaults.high_cut_slope),
        }
    }

    /// Create a store and write `settings` into it
    pub fn from_settings(settings: &ChainSettings) -> Result<Self, ParamError> {
        let store = Self::new();
        store.apply_settings(settings)?;
        Ok(store)
    }

    fn float_cell(&self, id: ParamId) -> Option<&AtomicCell<f32>> {
        match id {
            ParamId::LowCutFreq => Some(&self.low_cut_freq),
            ParamId::HighCutFreq => Some(&self.high_cut_freq),
            ParamId::PeakFreq => Some(&self.peak_freq),
            ParamId::PeakGain => Some(&self.peak_gain_db),
            ParamId::PeakQuality => Some(&self.peak_quality),
            ParamId::LowCutSlope | ParamId::HighCutSlope => None,
        }
    }

    fn slope_cell(&self, id: ParamId) -> Option<&AtomicCell<Slope>> {
        match id {
            ParamId::LowCutSlope => Some(&self.low_cut_slope),
            ParamId::HighCutSlope => Some(&self.high_cut_slope),
            _ => None,
        }
    }

    /// Current plain value (choice index for slopes)
    pub fn get(&self, id: ParamId) -> f32 {
        match (self.float_cell(id), self.slope_cell(id)) {
            (Some(cell), _) => cell.load(),
            (None, Some(cell)) => cell.load().index() as f32,
            (None, None) => id.default_value(),
        }
    }

    /// Write a plain value
    ///
    /// Floats are clamped and snapped. Slopes take a choice index; an index
    /// outside 0..=3 is rejected and the stored slope is left unchanged.
    pub fn set(&self, id: ParamId, value: f32) -> Result<(), ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite(id));
        }

        if let (Some(cell), Some(range)) = (self.float_cell(id), id.range()) {
            cell.store(range.snap_to_legal_value(value));
            return Ok(());
        }

        self.set_choice(id, value.round() as i64)
    }

    /// Write a choice parameter by index
    pub fn set_choice(&self, id: ParamId, index: i64) -> Result<(), ParamError> {
        let cell = self
            .slope_cell(id)
            .ok_or_else(|| ParamError::UnknownParameter(format!("{} is not a choice", id.id())))?;

        let slope = usize::try_from(index)
            .ok()
            .and_then(Slope::from_index)
            .ok_or(ParamError::InvalidChoice {
                param: id,
                index,
                max: Slope::ALL.len() - 1,
            })?;

        cell.store(slope);
        Ok(())
    }

    pub fn set_low_cut_slope(&self, slope: Slope) {
        self.low_cut_slope.store(slope);
    }

    pub fn set_high_cut_slope(&self, slope: Slope) {
        self.high_cut_slope.store(slope);
    }

    /// Current value mapped into [0, 1]
    pub fn get_normalised(&self, id: ParamId) -> f32 {
        match id.range() {
            Some(range) => range.convert_to_normalised(self.get(id)),
            None => self.get(id) / (Slope::ALL.len() - 1) as f32,
        }
    }

    /// Write a host-normalised value in [0, 1]
    pub fn set_normalised(&self, id: ParamId, normalised: f32) -> Result<(), ParamError> {
        if !normalised.is_finite() {
            return Err(ParamError::NonFinite(id));
        }

        let normalised = normalised.clamp(0.0, 1.0);
        match id.range() {
            Some(range) => self.set(id, range.convert_from_normalised(normalised)),
            None => {
                let max = (Slope::ALL.len() - 1) as f32;
                self.set_choice(id, (normalised * max).round() as i64)
            }
        }
    }

    /// Write every field of a snapshot
    pub fn apply_settings(&self, settings: &ChainSettings) -> Result<(), ParamError> {
        self.set(ParamId::LowCutFreq, settings.low_cut_freq)?;
        self.set(ParamId::HighCutFreq, settings.high_cut_freq)?;
        self.set(ParamId::PeakFreq, settings.peak_freq)?;
        self.set(ParamId::PeakGain, settings.peak_gain_db)?;
        self.set(ParamId::PeakQuality, settings.peak_quality)?;
        self.set_low_cut_slope(settings.low_cut_slope);
        self.set_high_cut_slope(settings.high_cut_slope);
        Ok(())
    }

    /// Read every field into a snapshot
    ///
    /// Each field is read atomically on its own; a writer racing this call
    /// may land in the next block instead of this one.
    #[inline]
    pub fn capture_settings(&self) -> ChainSettings {
        ChainSettings {
            low_cut_freq: self.low_cut_freq.load(),
            high_cut_freq: self.high_cut_freq.load(),
            peak_freq: self.peak_freq.load(),
            peak_gain_db: self.peak_gain_db.load(),
            peak_quality: self.peak_quality.load(),
            low_cut_slope: self.low_cut_slope.load(),
            high_cut_slope: self.high_cut_slope.load(),
        }
    }
}

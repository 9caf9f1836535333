//! Fader tapers and value display
//!
//! A fader always stores and moves in the hardware's raw domain. The taper
//! decides two things:
//! - how a normalized fader position (0.0-1.0) maps to a raw value
//! - how a raw value is labeled
//!
//! Position mapping is the same affine map for every taper, so dragging never
//! round-trips through decibels. Only the label differs.

use crate::provider::ParamRange;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed nominal headroom of the mixer gain format: full scale reads +12 dB
pub const HEADROOM_DB: f64 = 12.0;

/// Decibel range used when a gang asks for dB display without a range
pub const DEFAULT_RANGE_DB: f32 = 72.0;

/// Unit a gang displays its value in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayUnit {
    /// Decibels relative to the hardware's full scale plus headroom
    Db,
    /// Raw integer register value
    #[default]
    Raw,
}

impl DisplayUnit {
    /// Resolve the unit from optional config fields
    ///
    /// An explicit unit wins. Otherwise a configured decibel range implies dB.
    pub fn resolve(unit: Option<DisplayUnit>, taper_db: Option<f32>) -> Self {
        match (unit, taper_db) {
            (Some(unit), _) => unit,
            (None, Some(_)) => DisplayUnit::Db,
            (None, None) => DisplayUnit::Raw,
        }
    }
}

impl fmt::Display for DisplayUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayUnit::Db => write!(f, "db"),
            DisplayUnit::Raw => write!(f, "raw"),
        }
    }
}

/// Value curve of a fader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Taper {
    /// Raw value shown as-is
    Linear,
    /// Raw value shown in dB; anything below `HEADROOM_DB - range_db` is silent
    Decibel { range_db: f32 },
}

impl Taper {
    /// Build the taper for a gang
    pub fn for_unit(unit: DisplayUnit, taper_db: Option<f32>) -> Self {
        match unit {
            DisplayUnit::Db => Taper::Decibel {
                range_db: taper_db.unwrap_or(DEFAULT_RANGE_DB),
            },
            DisplayUnit::Raw => {
                if let Some(range_db) = taper_db {
                    log::debug!("Ignoring taper range {} dB for raw display", range_db);
                }
                Taper::Linear
            }
        }
    }

    /// Map a normalized fader position to a raw value
    pub fn to_raw(&self, position: f32, range: ParamRange) -> i64 {
        let position = position.clamp(0.0, 1.0) as f64;
        let offset = (position * range.span() as f64).round() as i128;
        // f64 rounding can overshoot max on 64-bit ranges
        (range.min as i128 + offset).clamp(range.min as i128, range.max as i128) as i64
    }

    /// Map a raw value to a normalized fader position
    pub fn to_position(&self, raw: i64, range: ParamRange) -> f32 {
        if range.span() <= 0 {
            return 0.0;
        }
        let raw = range.clamp(raw);
        ((raw as i128 - range.min as i128) as f64 / range.span() as f64) as f32
    }

    /// Convert a raw value to its display reading
    pub fn reading(&self, raw: i64, range: ParamRange) -> Reading {
        match *self {
            Taper::Linear => Reading::Raw(raw),
            Taper::Decibel { range_db } => match raw_to_db(raw, range) {
                Some(db) if db >= HEADROOM_DB - range_db as f64 => Reading::Db(db),
                _ => Reading::Silent,
            },
        }
    }

    /// Display string for a raw value
    pub fn format(&self, raw: i64, range: ParamRange) -> String {
        self.reading(raw, range).to_string()
    }
}

/// Hardware gain in dB: `20*log10(raw/max) + 12`
///
/// `None` at or below the range minimum, or wherever the logarithm is
/// undefined.
pub fn raw_to_db(raw: i64, range: ParamRange) -> Option<f64> {
    if raw <= range.min || raw <= 0 || range.max <= 0 {
        return None;
    }
    Some(20.0 * (raw as f64 / range.max as f64).log10() + HEADROOM_DB)
}

/// Displayed value of a fader
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Below the audible floor
    Silent,
    Db(f64),
    Raw(i64),
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Silent => write!(f, "-∞ dB"),
            Reading::Db(db) => write!(f, "{:.2} dB", db),
            Reading::Raw(raw) => write!(f, "{}", raw),
        }
    }
}

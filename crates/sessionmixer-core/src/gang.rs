//! Ganged faders: one UI control driving several hardware parameters
//!
//! A gang broadcasts every UI change to all of its channels. It folds
//! hardware changes from any member back into one logical value. It may also
//! carry read-only level meters, which tint the fader track (see [`crate::level`]).

use crate::channel::MixerChannel;
use crate::error::{MixerError, MixerResult};
use crate::level::{level_color, LevelColor};
use crate::provider::{ParamId, ParamRange, ParameterBinding};
use crate::taper::{DisplayUnit, Taper};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

/// How ganged channels are kept in step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GangMode {
    /// Every channel gets the same raw value
    #[default]
    Mirror,
    /// Keep the offsets between channels (not implemented, runs as mirror)
    Relative,
    /// Scale into each channel's own range (not implemented, runs as mirror)
    Scaled,
}

impl GangMode {
    /// The mode the gang actually runs in
    pub fn effective(&self) -> GangMode {
        GangMode::Mirror
    }

    pub fn is_fallback(&self) -> bool {
        self.effective() != *self
    }
}

/// One fader controlling one or more hardware channels
pub struct Gang {
    name: String,
    unit: DisplayUnit,
    mode: GangMode,
    /// Ganged channels, in config order
    channels: Vec<MixerChannel>,
    /// Fader position in raw units; the common value in mirror mode
    last_value: AtomicI64,
    /// Fader range, taken from the first channel
    range: ParamRange,
    taper: Taper,
    /// Read-only level meters for the track color
    level_bindings: Vec<Arc<dyn ParameterBinding>>,
    level_range: ParamRange,
    /// Set once the mode fallback has been reported
    fallback_logged: AtomicBool,
}

impl Gang {
    /// Create a gang over already-initialized channels
    ///
    /// `taper_db` selects the decibel range of a dB-labeled fader and must be
    /// positive when present. All channels are assumed to share the first
    /// channel's range.
    pub fn new(
        name: impl Into<String>,
        unit: DisplayUnit,
        mode: GangMode,
        channels: Vec<MixerChannel>,
        level_bindings: Vec<Arc<dyn ParameterBinding>>,
        taper_db: Option<f32>,
    ) -> MixerResult<Self> {
        let name = name.into();

        let Some(first) = channels.first() else {
            return Err(MixerError::config(&name, "gang must have at least 1 channel"));
        };

        if let Some(range_db) = taper_db {
            if !range_db.is_finite() || range_db <= 0.0 {
                return Err(MixerError::config(
                    &name,
                    format!("taper range must be a positive number of dB, got {}", range_db),
                ));
            }
        }

        let range = first.range();
        let initial = first.current_value();

        for ch in &channels[1..] {
            if ch.range() != range {
                log::warn!(
                    "Gang '{}': {} has range {:?}, using {:?} from the first channel",
                    name,
                    ch.display_name(),
                    ch.range(),
                    range
                );
            }
        }

        let level_range = level_bindings
            .first()
            .map(|b| b.range())
            .unwrap_or(ParamRange::new(0, 0));

        Ok(Self {
            taper: Taper::for_unit(unit, taper_db),
            name,
            unit,
            mode,
            channels,
            last_value: AtomicI64::new(initial),
            range,
            level_bindings,
            level_range,
            fallback_logged: AtomicBool::new(false),
        })
    }

    /// Apply a UI change to every channel in the gang
    ///
    /// Every channel is written even if an earlier one fails. The last
    /// failure is returned.
    pub fn handle_ui_change(&self, value: i64) -> MixerResult<()> {
        let value = self.range.clamp(value);
        if self.last_value.load(Ordering::Relaxed) == value {
            return Ok(());
        }

        self.last_value.store(value, Ordering::Relaxed);

        if self.mode.is_fallback() && !self.fallback_logged.swap(true, Ordering::Relaxed) {
            log::warn!(
                "Gang '{}': {:?} mode not yet implemented, using mirror mode",
                self.name,
                self.mode
            );
        }

        match self.mode.effective() {
            GangMode::Mirror | GangMode::Relative | GangMode::Scaled => {
                self.handle_mirror_mode(value)
            }
        }
    }

    /// Apply a UI fader position (0.0-1.0) through the taper
    pub fn handle_ui_position(&self, position: f32) -> MixerResult<()> {
        self.handle_ui_change(self.taper.to_raw(position, self.range))
    }

    /// Write the same value to every channel
    fn handle_mirror_mode(&self, value: i64) -> MixerResult<()> {
        let mut last_err = None;

        for ch in &self.channels {
            // Each channel skips the write if it already holds the value
            if let Err(e) = ch.handle_ui_change(value) {
                last_err = Some(e);
            }
        }

        match last_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Apply a hardware change reported for one of this gang's parameters
    ///
    /// Returns false, and does nothing, if `id` is not a member. In mirror
    /// mode the reporting channel's value becomes the gang value. Channels
    /// are assumed identical, so the others are not consulted.
    pub fn handle_hw_change(&self, id: ParamId, value: i64) -> bool {
        let Some(ch) = self.channels.iter().find(|ch| ch.id() == id) else {
            return false;
        };

        ch.handle_hw_change(value);

        if self.mode.effective() == GangMode::Mirror {
            self.last_value
                .store(self.range.clamp(value), Ordering::Relaxed);
        }

        true
    }

    /// Whether a parameter belongs to this gang
    pub fn owns(&self, id: ParamId) -> bool {
        self.channels.iter().any(|ch| ch.id() == id)
    }

    /// Current fader value
    pub fn current_value(&self) -> i64 {
        self.last_value.load(Ordering::Relaxed)
    }

    /// Current fader position (0.0-1.0)
    pub fn current_position(&self) -> f32 {
        self.taper.to_position(self.current_value(), self.range)
    }

    /// Label for a raw value
    pub fn format_value(&self, raw: i64) -> String {
        self.taper.format(raw, self.range)
    }

    /// Label for a fader position, for GUI widgets that format by position
    pub fn format_position(&self, position: f32) -> String {
        self.format_value(self.taper.to_raw(position, self.range))
    }

    pub fn has_levels(&self) -> bool {
        !self.level_bindings.is_empty()
    }

    /// Peak value across all level meters
    ///
    /// A meter that cannot be read counts as no signal. `None` if the gang
    /// has no meters or none of them could be read.
    pub fn max_level(&self) -> Option<i64> {
        let mut peak = None;
        for binding in &self.level_bindings {
            match binding.read() {
                Ok(level) => peak = Some(peak.map_or(level, |p: i64| p.max(level))),
                Err(e) => log::trace!("Gang '{}': level {} unreadable: {}", self.name, binding.name(), e),
            }
        }
        peak
    }

    /// Track color from the current peak level
    pub fn level_color(&self) -> Option<LevelColor> {
        self.max_level()
            .map(|level| level_color(level, self.level_range))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> DisplayUnit {
        self.unit
    }

    pub fn mode(&self) -> GangMode {
        self.mode
    }

    pub fn taper(&self) -> Taper {
        self.taper
    }

    pub fn min(&self) -> i64 {
        self.range.min
    }

    pub fn max(&self) -> i64 {
        self.range.max
    }

    pub fn range(&self) -> ParamRange {
        self.range
    }

    pub fn level_range(&self) -> ParamRange {
        self.level_range
    }

    pub fn channels(&self) -> &[MixerChannel] {
        &self.channels
    }
}

impl std::fmt::Debug for Gang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gang")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("last_value", &self.current_value())
            .field("channels", &self.channels)
            .field("levels", &self.level_bindings.len())
            .finish()
    }
}

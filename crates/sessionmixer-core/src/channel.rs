//! Single hardware parameter behind a fader
//!
//! A channel keeps two caches of its parameter:
//! - `last_ui_value`: last value set by the UI, and what the UI draws
//! - `last_hw_value`: last value reported by the hardware
//!
//! Both are plain atomics. The UI thread and the dispatcher thread each touch
//! them without taking a lock. The hardware stays the source of truth; the
//! caches only exist so neither side has to wait on the other.
//!
//! # Feedback loop
//!
//! ```text
//! UI drag → write(v) → hardware → event(v) → handle_hw_change(v)
//!                                               │
//!                                  v == last_hw_value? ─ no → update caches
//!                                               │
//!                                              yes → stop
//! ```
//!
//! A UI write is echoed back by the hardware with the same value. The HW-side
//! equality check absorbs that echo, so it never re-enters the write path.

use crate::error::{MixerError, MixerResult};
use crate::provider::{ParamId, ParamRange, ParameterBinding};
use crate::taper::DisplayUnit;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// One fader-controlled hardware parameter
pub struct MixerChannel {
    /// Hardware control
    binding: Arc<dyn ParameterBinding>,
    display_name: String,
    unit: DisplayUnit,
    /// Last value set by the UI
    last_ui_value: AtomicI64,
    /// Last value observed from hardware
    last_hw_value: AtomicI64,
}

impl MixerChannel {
    /// Create a channel, seeding both caches from one hardware read
    pub fn new(
        binding: Arc<dyn ParameterBinding>,
        display_name: impl Into<String>,
        unit: DisplayUnit,
    ) -> MixerResult<Self> {
        let initial = binding.read().map_err(|source| MixerError::Init {
            parameter: binding.name().to_string(),
            source,
        })?;
        let initial = binding.range().clamp(initial);

        Ok(Self {
            binding,
            display_name: display_name.into(),
            unit,
            last_ui_value: AtomicI64::new(initial),
            last_hw_value: AtomicI64::new(initial),
        })
    }

    /// Apply a UI-originated value and write it to hardware
    ///
    /// Writes immediately, with no debouncing. Unchanged values are skipped,
    /// so a drag that lands on the same step does not touch the hardware. On
    /// a failed write the cache keeps the requested value; the next hardware
    /// event reconciles it.
    pub fn handle_ui_change(&self, value: i64) -> MixerResult<()> {
        let value = self.binding.range().clamp(value);
        if self.last_ui_value.load(Ordering::Relaxed) == value {
            return Ok(());
        }

        self.last_ui_value.store(value, Ordering::Relaxed);

        self.binding.write(value).map_err(|source| {
            log::warn!(
                "Failed to write {} to {}: {}",
                value,
                self.binding.name(),
                source
            );
            MixerError::Write {
                id: self.binding.id(),
                parameter: self.binding.name().to_string(),
                value,
                source,
            }
        })
    }

    /// Apply a hardware-originated value
    ///
    /// An unchanged value is the echo of our own write and is dropped here.
    /// A changed value overwrites both caches; hardware wins over any stale
    /// UI value.
    pub fn handle_hw_change(&self, value: i64) {
        let value = self.binding.range().clamp(value);
        if self.last_hw_value.load(Ordering::Relaxed) == value {
            return;
        }

        self.last_hw_value.store(value, Ordering::Relaxed);
        self.last_ui_value.store(value, Ordering::Relaxed);
    }

    /// Value the UI should display
    pub fn current_value(&self) -> i64 {
        self.last_ui_value.load(Ordering::Relaxed)
    }

    /// Last value reported by hardware
    pub fn last_hw_value(&self) -> i64 {
        self.last_hw_value.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> ParamId {
        self.binding.id()
    }

    pub fn range(&self) -> ParamRange {
        self.binding.range()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn unit(&self) -> DisplayUnit {
        self.unit
    }

    pub fn binding(&self) -> &Arc<dyn ParameterBinding> {
        &self.binding
    }
}

impl std::fmt::Debug for MixerChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixerChannel")
            .field("id", &self.id())
            .field("display_name", &self.display_name)
            .field("last_ui_value", &self.current_value())
            .field("last_hw_value", &self.last_hw_value())
            .finish()
    }
}

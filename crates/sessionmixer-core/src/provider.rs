//! Hardware control provider boundary
//!
//! The engine never talks to a device directly. Everything it needs from the
//! hardware layer goes through these traits:
//!
//! - [`ControlProvider::find_parameter`] resolves a parameter by name
//! - [`ParameterBinding::read`] / [`ParameterBinding::write`] move values
//! - [`ControlProvider::subscribe`] opens the change-notification stream
//! - [`Subscription::stop`] releases it
//!
//! Providers must echo every write they accept back through the stream with
//! the identical value. The channel equality checks rely on that echo.

use crate::error::ProviderError;
use flume::Receiver;
use std::fmt;
use std::sync::Arc;

/// Stable numeric identity of a hardware parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(pub u32);

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value type of a hardware parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Integer,
    Integer64,
    Boolean,
    Enumerated,
    Bytes,
}

impl ParamKind {
    /// Only integer-valued scalars can back a fader or a level indicator
    pub fn is_integer(&self) -> bool {
        matches!(self, ParamKind::Integer | ParamKind::Integer64)
    }
}

/// Whether the engine may write to a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadWrite,
    ReadOnly,
}

/// Inclusive numeric range of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamRange {
    pub min: i64,
    pub max: i64,
}

impl ParamRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Clamp a value into the range
    pub fn clamp(&self, value: i64) -> i64 {
        value.max(self.min).min(self.max)
    }

    /// Distance between the bounds; wider than `i64` for 64-bit ranges
    pub fn span(&self) -> i128 {
        self.max as i128 - self.min as i128
    }
}

/// A single hardware parameter the engine can read and write
///
/// Implementations are shared between the UI thread and the dispatcher
/// thread, so they must be `Send + Sync`.
pub trait ParameterBinding: Send + Sync {
    /// Stable identity used to route change notifications
    fn id(&self) -> ParamId;

    /// Name the parameter was resolved by
    fn name(&self) -> &str;

    fn kind(&self) -> ParamKind;

    fn access(&self) -> Access;

    fn range(&self) -> ParamRange;

    /// Read the current hardware value
    fn read(&self) -> Result<i64, ProviderError>;

    /// Write a new hardware value
    fn write(&self, value: i64) -> Result<(), ProviderError>;
}

/// A hardware-originated value change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEvent {
    pub id: ParamId,
    pub value: i64,
}

impl ControlEvent {
    pub fn new(id: ParamId, value: i64) -> Self {
        Self { id, value }
    }
}

/// Item delivered on a subscription stream
pub type EventResult = Result<ControlEvent, ProviderError>;

/// Source of hardware parameters and change notifications
pub trait ControlProvider: Send + Sync {
    /// Resolve a parameter by its hardware name
    fn find_parameter(&self, name: &str) -> Result<Arc<dyn ParameterBinding>, ProviderError>;

    /// Open the change-notification stream
    fn subscribe(&self) -> Result<Subscription, ProviderError>;
}

/// An open change-notification stream
///
/// The provider pushes events into the sending half of a flume channel. When
/// the provider drops that sender the stream ends.
pub struct Subscription {
    events: Receiver<EventResult>,
    cancel: Box<dyn FnOnce() + Send>,
}

impl Subscription {
    /// Create a subscription from an event receiver and a cancel callback
    ///
    /// `cancel` runs at most once, when the subscription is stopped.
    pub fn new(events: Receiver<EventResult>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            events,
            cancel: Box::new(cancel),
        }
    }

    /// Separate the event stream from its stop handle
    ///
    /// The receiver moves to the consuming thread while the handle stays with
    /// the owner that decides when to stop.
    pub fn into_parts(self) -> (Receiver<EventResult>, SubscriptionHandle) {
        (
            self.events,
            SubscriptionHandle {
                cancel: Some(self.cancel),
            },
        )
    }
}

/// Stop handle for a [`Subscription`]
///
/// Stopping is idempotent and also happens on drop.
pub struct SubscriptionHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl SubscriptionHandle {
    /// Release the subscription
    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_none()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_range_clamp() {
        let range = ParamRange::new(0, 65536);
        assert_eq!(range.clamp(-5), 0);
        assert_eq!(range.clamp(70000), 65536);
        assert_eq!(range.clamp(1234), 1234);
        assert_eq!(range.span(), 65536);

        let full = ParamRange::new(i64::MIN, i64::MAX);
        assert_eq!(full.span(), u64::MAX as i128);
        assert_eq!(full.clamp(0), 0);
    }

    #[test]
    fn test_integer_kinds() {
        assert!(ParamKind::Integer.is_integer());
        assert!(ParamKind::Integer64.is_integer());
        assert!(!ParamKind::Boolean.is_integer());
        assert!(!ParamKind::Enumerated.is_integer());
        assert!(!ParamKind::Bytes.is_integer());
    }

    #[test]
    fn test_subscription_handle_stops_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let (_tx, rx) = flume::unbounded::<EventResult>();

        let subscription = Subscription::new(rx, move || {
            counter.fetch_add(1, Ordering::Relaxed);
        });
        let (_events, mut handle) = subscription.into_parts();

        assert!(!handle.is_stopped());
        handle.stop();
        handle.stop();
        drop(handle);

        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}

//! In-memory control provider
//!
//! `SimulatedCard` behaves like a mixer card as far as the engine can tell.
//! Parameters have ranges and values, and every accepted write is echoed on
//! all open subscriptions with the identical value. It also counts reads and
//! writes per parameter. Failures can be injected for reads, writes,
//! subscribing, and the event stream itself.
//!
//! ```ignore
//! let mut card = SimulatedCard::new();
//! card.add_control("Mix A Input 01 Playback Volume", 0, 65536, 0);
//! card.add_level("Level Meter 1", 0, 4095, 0);
//! let card = Arc::new(card);
//!
//! // Another application moves the fader
//! card.set_external("Mix A Input 01 Playback Volume", 40000);
//! ```

use crate::error::ProviderError;
use crate::provider::{
    Access, ControlEvent, ControlProvider, EventResult, ParamId, ParamKind, ParamRange,
    ParameterBinding, Subscription,
};
use flume::Sender;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Open subscriptions of a card
#[derive(Default)]
struct EventBus {
    subscribers: Mutex<Vec<(u64, Sender<EventResult>)>>,
    next_subscriber: AtomicU64,
}

impl EventBus {
    /// Deliver an item to every live subscriber, dropping closed ones
    fn publish(&self, item: EventResult) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.retain(|(_, tx)| tx.send(item.clone()).is_ok());
        }
    }

    fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = flume::unbounded();
        let key = self.next_subscriber.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push((key, tx));
        }

        let bus = Arc::clone(self);
        Subscription::new(rx, move || {
            if let Ok(mut subscribers) = bus.subscribers.lock() {
                subscribers.retain(|(k, _)| *k != key);
            }
        })
    }

    fn close_all(&self) {
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.clear();
        }
    }

    fn len(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

/// One simulated hardware parameter
pub struct SimParameter {
    id: ParamId,
    name: String,
    kind: ParamKind,
    access: Access,
    range: ParamRange,
    value: AtomicI64,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    bus: Arc<EventBus>,
}

impl ParameterBinding for SimParameter {
    fn id(&self) -> ParamId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ParamKind {
        self.kind
    }

    fn access(&self) -> Access {
        self.access
    }

    fn range(&self) -> ParamRange {
        self.range
    }

    fn read(&self) -> Result<i64, ProviderError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(ProviderError::Io(format!("read of '{}' failed", self.name)));
        }
        Ok(self.value.load(Ordering::Relaxed))
    }

    fn write(&self, value: i64) -> Result<(), ProviderError> {
        if self.access == Access::ReadOnly {
            return Err(ProviderError::Io(format!("'{}' is read-only", self.name)));
        }
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(ProviderError::Io(format!("write to '{}' failed", self.name)));
        }

        let value = self.range.clamp(value);
        self.value.store(value, Ordering::Relaxed);
        self.writes.fetch_add(1, Ordering::Relaxed);

        // Hardware echoes accepted writes back through the event stream
        self.bus.publish(Ok(ControlEvent::new(self.id, value)));
        Ok(())
    }
}

/// In-memory mixer card
#[derive(Default)]
pub struct SimulatedCard {
    params: Vec<Arc<SimParameter>>,
    bus: Arc<EventBus>,
    fail_subscribe: AtomicBool,
}

impl SimulatedCard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter; ids are assigned in insertion order starting at 1
    pub fn add_parameter(
        &mut self,
        name: &str,
        kind: ParamKind,
        access: Access,
        range: ParamRange,
        initial: i64,
    ) -> ParamId {
        let id = ParamId(self.params.len() as u32 + 1);
        self.params.push(Arc::new(SimParameter {
            id,
            name: name.to_string(),
            kind,
            access,
            range,
            value: AtomicI64::new(range.clamp(initial)),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            bus: Arc::clone(&self.bus),
        }));
        id
    }

    /// Add a writable integer parameter (fader gain, routing level)
    pub fn add_control(&mut self, name: &str, min: i64, max: i64, initial: i64) -> ParamId {
        self.add_parameter(
            name,
            ParamKind::Integer,
            Access::ReadWrite,
            ParamRange::new(min, max),
            initial,
        )
    }

    /// Add a read-only integer parameter (level meter)
    pub fn add_level(&mut self, name: &str, min: i64, max: i64, initial: i64) -> ParamId {
        self.add_parameter(
            name,
            ParamKind::Integer,
            Access::ReadOnly,
            ParamRange::new(min, max),
            initial,
        )
    }

    fn param(&self, name: &str) -> Option<&Arc<SimParameter>> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Resolve a parameter as the engine would
    pub fn binding(&self, name: &str) -> Result<Arc<dyn ParameterBinding>, ProviderError> {
        self.find_parameter(name)
    }

    pub fn id_of(&self, name: &str) -> Option<ParamId> {
        self.param(name).map(|p| p.id)
    }

    /// Current hardware value of a parameter
    pub fn value(&self, name: &str) -> i64 {
        self.param(name)
            .map(|p| p.value.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Number of successful writes to a parameter
    pub fn writes(&self, name: &str) -> usize {
        self.param(name)
            .map(|p| p.writes.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Number of read attempts on a parameter
    pub fn reads(&self, name: &str) -> usize {
        self.param(name)
            .map(|p| p.reads.load(Ordering::Relaxed))
            .unwrap_or_default()
    }

    /// Total successful writes across all parameters
    pub fn total_writes(&self) -> usize {
        self.params
            .iter()
            .map(|p| p.writes.load(Ordering::Relaxed))
            .sum()
    }

    pub fn fail_reads(&self, name: &str, fail: bool) {
        if let Some(p) = self.param(name) {
            p.fail_reads.store(fail, Ordering::Relaxed);
        }
    }

    pub fn fail_writes(&self, name: &str, fail: bool) {
        if let Some(p) = self.param(name) {
            p.fail_writes.store(fail, Ordering::Relaxed);
        }
    }

    /// Make the next `subscribe` calls fail
    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.store(fail, Ordering::Relaxed);
    }

    /// Change a value from outside the engine (front panel, other software)
    ///
    /// Notifies subscribers without counting as a write. Returns false if the
    /// parameter does not exist.
    pub fn set_external(&self, name: &str, value: i64) -> bool {
        match self.param(name) {
            Some(p) => {
                let value = p.range.clamp(value);
                p.value.store(value, Ordering::Relaxed);
                self.bus.publish(Ok(ControlEvent::new(p.id, value)));
                true
            }
            None => false,
        }
    }

    /// Set a meter value silently; meters are polled, not subscribed
    pub fn set_level(&self, name: &str, value: i64) {
        if let Some(p) = self.param(name) {
            p.value.store(p.range.clamp(value), Ordering::Relaxed);
        }
    }

    /// Emit an event for an id that may not exist on the card
    pub fn emit_raw(&self, event: ControlEvent) {
        self.bus.publish(Ok(event));
    }

    /// Push a stream error to every subscriber
    pub fn fail_stream(&self, error: ProviderError) {
        self.bus.publish(Err(error));
    }

    /// Close every open subscription from the provider side
    pub fn close_stream(&self) {
        self.bus.close_all();
    }

    pub fn subscriber_count(&self) -> usize {
        self.bus.len()
    }
}

impl ControlProvider for SimulatedCard {
    fn find_parameter(&self, name: &str) -> Result<Arc<dyn ParameterBinding>, ProviderError> {
        self.param(name)
            .map(|p| Arc::clone(p) as Arc<dyn ParameterBinding>)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    fn subscribe(&self) -> Result<Subscription, ProviderError> {
        if self.fail_subscribe.load(Ordering::Relaxed) {
            return Err(ProviderError::Io("cannot open control event stream".into()));
        }
        Ok(self.bus.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_is_echoed() {
        let mut card = SimulatedCard::new();
        let id = card.add_control("Volume", 0, 100, 0);
        let (events, _handle) = card.subscribe().unwrap().into_parts();

        card.binding("Volume").unwrap().write(42).unwrap();

        assert_eq!(events.try_recv().unwrap(), Ok(ControlEvent::new(id, 42)));
        assert_eq!(card.writes("Volume"), 1);
        assert_eq!(card.value("Volume"), 42);
    }

    #[test]
    fn test_external_change_is_not_a_write() {
        let mut card = SimulatedCard::new();
        let id = card.add_control("Volume", 0, 100, 0);
        let (events, _handle) = card.subscribe().unwrap().into_parts();

        assert!(card.set_external("Volume", 70));
        assert!(!card.set_external("Missing", 70));

        assert_eq!(events.try_recv().unwrap(), Ok(ControlEvent::new(id, 70)));
        assert_eq!(card.writes("Volume"), 0);
    }

    #[test]
    fn test_stop_removes_subscriber() {
        let card = SimulatedCard::new();
        let (events, mut handle) = card.subscribe().unwrap().into_parts();
        assert_eq!(card.subscriber_count(), 1);

        handle.stop();
        assert_eq!(card.subscriber_count(), 0);
        assert!(events.recv().is_err());
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let mut card = SimulatedCard::new();
        card.add_level("Meter", 0, 4095, 12);
        let meter = card.binding("Meter").unwrap();

        assert!(meter.write(1).is_err());
        assert_eq!(meter.read(), Ok(12));
    }

    #[test]
    fn test_missing_parameter() {
        let card = SimulatedCard::new();
        assert_eq!(
            card.find_parameter("Nope").err(),
            Some(ProviderError::NotFound("Nope".into()))
        );
    }
}

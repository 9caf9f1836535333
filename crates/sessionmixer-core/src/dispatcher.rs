//! Hardware change dispatcher
//!
//! Consumes the provider's change-notification stream on a dedicated thread
//! and routes every event to the gang that owns the parameter:
//!
//! ```text
//! provider ──(id, value)──► hw-dispatcher thread ──► routes[id] ──► Gang::handle_hw_change
//!                                  │
//!                     stream error / close ──► failure channel ──► take_failure()
//! ```
//!
//! A stream failure ends the thread. It is not retried; the owner is expected
//! to poll [`Dispatcher::take_failure`] and tell the operator that live
//! hardware sync is gone.

use crate::error::{MixerError, MixerResult, ProviderError};
use crate::gang::Gang;
use crate::provider::{ControlEvent, ControlProvider, EventResult, ParamId, SubscriptionHandle};
use flume::{Receiver, RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// How often the worker checks the shutdown flag while the stream is idle
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Parameter id → owning gang
struct Router {
    gangs: Arc<[Gang]>,
    routes: HashMap<ParamId, usize>,
}

impl Router {
    fn new(gangs: Arc<[Gang]>) -> Self {
        let mut routes = HashMap::new();
        for (index, gang) in gangs.iter().enumerate() {
            for ch in gang.channels() {
                // First gang wins, same as scanning in gang order
                routes.entry(ch.id()).or_insert(index);
            }
        }
        Self { gangs, routes }
    }

    fn dispatch(&self, event: ControlEvent) -> bool {
        match self.routes.get(&event.id) {
            Some(&index) => self.gangs[index].handle_hw_change(event.id, event.value),
            None => {
                log::trace!("Dropping event for unowned parameter {}", event.id);
                false
            }
        }
    }
}

/// Running hardware event dispatcher
///
/// Stops on drop.
pub struct Dispatcher {
    router: Arc<Router>,
    /// Stream stop handle
    subscription: Option<SubscriptionHandle>,
    /// Worker join handle
    handle: Option<JoinHandle<()>>,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
    /// Whether the worker loop is still running (set to false on exit)
    alive: Arc<AtomicBool>,
    failure_rx: Receiver<MixerError>,
}

impl Dispatcher {
    /// Subscribe to the provider and start routing events to `gangs`
    pub fn start(provider: &dyn ControlProvider, gangs: Arc<[Gang]>) -> MixerResult<Self> {
        let router = Arc::new(Router::new(gangs));

        let (events, subscription) = provider
            .subscribe()
            .map_err(MixerError::Subscription)?
            .into_parts();

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();
        let alive = Arc::new(AtomicBool::new(true));
        let alive_clone = alive.clone();
        let router_clone = router.clone();
        let (failure_tx, failure_rx) = flume::bounded(1);

        let handle = thread::Builder::new()
            .name("hw-dispatcher".into())
            .spawn(move || {
                Self::run(&router_clone, events, &shutdown_clone, failure_tx);
                alive_clone.store(false, Ordering::Relaxed);
            })
            .map_err(|e| {
                MixerError::Subscription(ProviderError::Io(format!(
                    "failed to spawn dispatcher thread: {}",
                    e
                )))
            })?;

        Ok(Self {
            router,
            subscription: Some(subscription),
            handle: Some(handle),
            shutdown,
            alive,
            failure_rx,
        })
    }

    /// Main loop running on the dispatcher thread
    fn run(
        router: &Router,
        events: Receiver<EventResult>,
        shutdown: &AtomicBool,
        failure_tx: Sender<MixerError>,
    ) {
        log::info!("Hardware dispatcher started for {} gang(s)", router.gangs.len());

        let failure = loop {
            if shutdown.load(Ordering::Relaxed) {
                break None;
            }

            match events.recv_timeout(POLL_INTERVAL) {
                Ok(Ok(event)) => {
                    router.dispatch(event);
                }
                Ok(Err(e)) => break Some(e),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    if shutdown.load(Ordering::Relaxed) {
                        break None;
                    }
                    break Some(ProviderError::Closed);
                }
            }
        };

        match failure {
            Some(e) => {
                log::error!("Hardware event stream failed, live sync stopped: {}", e);
                let _ = failure_tx.try_send(MixerError::Subscription(e));
            }
            None => log::info!("Hardware dispatcher stopped"),
        }
    }

    /// Route one event synchronously, on the calling thread
    ///
    /// Returns whether a gang owned the parameter.
    pub fn dispatch(&self, event: ControlEvent) -> bool {
        self.router.dispatch(event)
    }

    /// Whether the worker loop is still running
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// The error that ended the worker, if any; reported once
    pub fn take_failure(&self) -> Option<MixerError> {
        self.failure_rx.try_recv().ok()
    }

    pub fn gangs(&self) -> &Arc<[Gang]> {
        &self.router.gangs
    }

    /// Stop dispatching: release the subscription and join the worker
    ///
    /// Safe to call more than once.
    pub fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        if let Some(mut subscription) = self.subscription.take() {
            subscription.stop();
        }

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Hardware dispatcher thread panicked");
            }
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

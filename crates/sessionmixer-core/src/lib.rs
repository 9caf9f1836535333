//! Fader bank engine for audio interface mixers
//!
//! This crate provides:
//! - Ganged faders driving one or more hardware mixer parameters
//! - Bidirectional sync: UI moves are written to hardware at once, and
//!   hardware changes made elsewhere show up on the faders
//! - Decibel and raw fader labels
//! - Level-meter driven fader track colors
//! - YAML session configuration
//!
//! # Architecture
//!
//! ```text
//! GUI drag → SessionMixer::handle_ui_change → Gang → MixerChannel → provider write
//!                                                                        │
//!                                                                      echo
//!                                                                        ▼
//! GUI frame ← SessionMixer::faders ← Gang ← MixerChannel ← Dispatcher ← subscription
//! ```
//!
//! Hardware access sits behind the [`ControlProvider`] trait. Values are cached
//! in per-field atomics, so the GUI thread and the dispatcher thread never
//! block each other. The echo of a UI write is absorbed by an equality check
//! in [`MixerChannel::handle_hw_change`].

mod channel;
mod config;
mod dispatcher;
mod error;
mod gang;
mod level;
mod mapper;
mod mixer;
mod provider;
pub mod sim;
mod taper;

pub use channel::MixerChannel;
pub use config::{default_config_path, load_config, GangConfig, SessionConfig};
pub use dispatcher::Dispatcher;
pub use error::{EntryRole, MixerError, MixerResult, ProviderError, ResolveFailure};
pub use gang::{Gang, GangMode};
pub use level::{intensity_color, level_color, normalize_level, LevelColor, LEVEL_FLOOR_DB};
pub use mapper::ControlMapper;
pub use mixer::{FaderView, SessionMixer};
pub use provider::{
    Access, ControlEvent, ControlProvider, EventResult, ParamId, ParamKind, ParamRange,
    ParameterBinding, Subscription, SubscriptionHandle,
};
pub use taper::{raw_to_db, DisplayUnit, Reading, Taper, DEFAULT_RANGE_DB, HEADROOM_DB};

//! Session facade for a GUI
//!
//! `SessionMixer` owns the whole engine: it assembles gangs from the config,
//! starts the hardware dispatcher, and hands the GUI one [`FaderView`] per
//! gang every frame. The GUI reports fader moves back through
//! [`SessionMixer::handle_ui_change`].
//!
//! ```ignore
//! let config = load_config(&default_config_path())?;
//! let mixer = SessionMixer::open(provider, &config)?;
//!
//! // every frame
//! mixer.check_health()?;
//! for (index, fader) in mixer.faders().iter().enumerate() {
//!     if let Some(value) = draw_fader(fader) {
//!         let _ = mixer.handle_ui_change(index, value);
//!     }
//! }
//! ```

use crate::config::SessionConfig;
use crate::dispatcher::Dispatcher;
use crate::error::{MixerError, MixerResult};
use crate::gang::Gang;
use crate::level::LevelColor;
use crate::mapper::ControlMapper;
use crate::provider::ControlProvider;
use std::sync::{Arc, OnceLock};

/// Per-frame snapshot of one fader
#[derive(Debug, Clone, PartialEq)]
pub struct FaderView {
    pub name: String,
    /// Raw hardware value
    pub value: i64,
    pub min: i64,
    pub max: i64,
    /// Normalized position (0.0-1.0)
    pub position: f32,
    /// Display string of the current value
    pub label: String,
    /// Track color from the level meters, if the gang has any
    pub level_color: Option<LevelColor>,
}

impl FaderView {
    fn from_gang(gang: &Gang) -> Self {
        let value = gang.current_value();
        Self {
            name: gang.name().to_string(),
            value,
            min: gang.min(),
            max: gang.max(),
            position: gang.current_position(),
            label: gang.format_value(value),
            level_color: gang.level_color(),
        }
    }
}

/// Running mixer session
pub struct SessionMixer {
    provider: Arc<dyn ControlProvider>,
    config: SessionConfig,
    gangs: Arc<[Gang]>,
    dispatcher: Option<Dispatcher>,
    /// First fatal dispatcher error, kept for every later health check
    failure: OnceLock<MixerError>,
}

impl SessionMixer {
    /// Assemble all gangs and start live hardware sync
    pub fn open(provider: Arc<dyn ControlProvider>, config: &SessionConfig) -> MixerResult<Self> {
        config.validate()?;

        let gangs: Arc<[Gang]> = ControlMapper::new(provider.as_ref(), config)
            .load_gangs()?
            .into();

        let dispatcher = Dispatcher::start(provider.as_ref(), gangs.clone())?;

        log::info!("Session mixer running with {} fader(s)", gangs.len());

        Ok(Self {
            provider,
            config: config.clone(),
            gangs,
            dispatcher: Some(dispatcher),
            failure: OnceLock::new(),
        })
    }

    /// Snapshot of every fader, in config order
    pub fn faders(&self) -> Vec<FaderView> {
        self.gangs.iter().map(FaderView::from_gang).collect()
    }

    /// Apply a new raw value from the fader at `index`
    ///
    /// Write failures are returned for reporting; the fader keeps the value.
    pub fn handle_ui_change(&self, index: usize, value: i64) -> MixerResult<()> {
        match self.gangs.get(index) {
            Some(gang) => gang.handle_ui_change(value),
            None => {
                log::warn!("UI change for unknown fader {}", index);
                Ok(())
            }
        }
    }

    /// Apply a normalized position from the fader at `index`
    pub fn handle_ui_position(&self, index: usize, position: f32) -> MixerResult<()> {
        match self.gangs.get(index) {
            Some(gang) => gang.handle_ui_position(position),
            None => {
                log::warn!("UI change for unknown fader {}", index);
                Ok(())
            }
        }
    }

    /// Err once live hardware sync has been lost
    ///
    /// The faders keep working for UI writes, but no longer follow changes
    /// made elsewhere. The operator should be told.
    pub fn check_health(&self) -> MixerResult<()> {
        if let Some(e) = self.dispatcher.as_ref().and_then(|d| d.take_failure()) {
            let _ = self.failure.set(e);
        }

        match self.failure.get() {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }

    /// Whether hardware changes are still being followed
    pub fn is_live(&self) -> bool {
        self.dispatcher.as_ref().is_some_and(|d| d.is_running())
    }

    pub fn gangs(&self) -> &Arc<[Gang]> {
        &self.gangs
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn ControlProvider> {
        &self.provider
    }

    /// Stop live sync; safe to call more than once
    pub fn shutdown(&mut self) {
        if let Some(mut dispatcher) = self.dispatcher.take() {
            dispatcher.stop();
            log::info!("Session mixer stopped");
        }
    }
}

impl Drop for SessionMixer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

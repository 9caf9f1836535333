//! Gang assembly from configuration
//!
//! Resolves every configured parameter name against the provider and builds
//! channels and gangs from them. Assembly is all or nothing: the first
//! problem aborts it, with enough context to find the offending config entry.

use crate::channel::MixerChannel;
use crate::config::SessionConfig;
use crate::error::{EntryRole, MixerError, MixerResult, ResolveFailure};
use crate::gang::Gang;
use crate::provider::{Access, ControlProvider, ParamId, ParameterBinding};
use std::collections::HashMap;
use std::sync::Arc;

/// Builds gangs from a session config
pub struct ControlMapper<'a> {
    provider: &'a dyn ControlProvider,
    config: &'a SessionConfig,
}

impl<'a> ControlMapper<'a> {
    pub fn new(provider: &'a dyn ControlProvider, config: &'a SessionConfig) -> Self {
        Self { provider, config }
    }

    /// Resolve and initialize all configured gangs, in config order
    pub fn load_gangs(&self) -> MixerResult<Vec<Gang>> {
        let mut gangs = Vec::with_capacity(self.config.gangs.len());
        // Which gang first claimed each parameter
        let mut owners: HashMap<ParamId, usize> = HashMap::new();

        for (gang_index, gang_config) in self.config.gangs.iter().enumerate() {
            let unit = gang_config.display_unit();

            let mut channels = Vec::with_capacity(gang_config.controls.len());
            for (entry_index, control) in gang_config.controls.iter().enumerate() {
                let binding =
                    self.resolve(gang_index, &gang_config.name, EntryRole::Control, entry_index, control)?;

                if let Some(&owner) = owners.get(&binding.id()) {
                    log::warn!(
                        "Gang '{}': '{}' is already ganged in '{}'; hardware changes go to the first gang only",
                        gang_config.name,
                        control,
                        self.config.gangs[owner].name
                    );
                } else {
                    owners.insert(binding.id(), gang_index);
                }

                let display_name = format!("{} [{}]", gang_config.name, control);
                channels.push(MixerChannel::new(binding, display_name, unit)?);
            }

            let mut levels = Vec::with_capacity(gang_config.levels.len());
            for (entry_index, level) in gang_config.levels.iter().enumerate() {
                levels.push(self.resolve(gang_index, &gang_config.name, EntryRole::Level, entry_index, level)?);
            }

            let gang = Gang::new(
                gang_config.name.clone(),
                unit,
                gang_config.mode,
                channels,
                levels,
                gang_config.taper_db,
            )?;

            log::info!(
                "Gang {} '{}': {} channel(s), {} level(s), range {}..={}",
                gang_index,
                gang.name(),
                gang.channels().len(),
                gang_config.levels.len(),
                gang.min(),
                gang.max()
            );
            gangs.push(gang);
        }

        Ok(gangs)
    }

    /// Look up one parameter and check it can serve its role
    fn resolve(
        &self,
        gang_index: usize,
        gang_name: &str,
        role: EntryRole,
        entry_index: usize,
        parameter: &str,
    ) -> MixerResult<Arc<dyn ParameterBinding>> {
        let fail = |reason: ResolveFailure| MixerError::Resolution {
            gang_index,
            gang_name: gang_name.to_string(),
            role,
            entry_index,
            parameter: parameter.to_string(),
            reason,
        };

        let binding = self
            .provider
            .find_parameter(parameter)
            .map_err(|e| fail(ResolveFailure::NotFound(e)))?;

        if !binding.kind().is_integer() {
            return Err(fail(ResolveFailure::UnsupportedKind(binding.kind())));
        }

        if role == EntryRole::Control && binding.access() == Access::ReadOnly {
            return Err(fail(ResolveFailure::ReadOnly));
        }

        Ok(binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GangConfig;
    use crate::error::ProviderError;
    use crate::gang::GangMode;
    use crate::provider::{ParamKind, ParamRange};
    use crate::sim::SimulatedCard;
    use crate::taper::{DisplayUnit, Taper};

    fn card() -> SimulatedCard {
        let mut card = SimulatedCard::new();
        card.add_control("Mix A Input 01 Playback Volume", 0, 65536, 1000);
        card.add_control("Mix B Input 01 Playback Volume", 0, 65536, 1000);
        card.add_control("Mix C Input 02 Playback Volume", 0, 65536, 500);
        card.add_level("Level Meter 1", 0, 4095, 0);
        card.add_parameter(
            "Phantom Power",
            ParamKind::Boolean,
            Access::ReadWrite,
            ParamRange::new(0, 1),
            0,
        );
        card
    }

    fn gang_config(name: &str, controls: &[&str], levels: &[&str]) -> GangConfig {
        GangConfig {
            name: name.to_string(),
            controls: controls.iter().map(|c| c.to_string()).collect(),
            unit: None,
            taper_db: None,
            levels: levels.iter().map(|l| l.to_string()).collect(),
            mode: GangMode::Mirror,
        }
    }

    fn session(gangs: Vec<GangConfig>) -> SessionConfig {
        SessionConfig { card: 1, gangs }
    }

    #[test]
    fn test_load_gangs() {
        let card = card();
        let mut daw = gang_config(
            "DAW",
            &["Mix A Input 01 Playback Volume", "Mix B Input 01 Playback Volume"],
            &["Level Meter 1"],
        );
        daw.taper_db = Some(60.0);
        let mut phones = gang_config("Phones", &["Mix C Input 02 Playback Volume"], &[]);
        phones.mode = GangMode::Scaled;
        let config = session(vec![daw, phones]);

        let gangs = ControlMapper::new(&card, &config).load_gangs().unwrap();

        assert_eq!(gangs.len(), 2);
        assert_eq!(gangs[0].name(), "DAW");
        assert_eq!(gangs[0].channels().len(), 2);
        assert_eq!(
            gangs[0].channels()[1].display_name(),
            "DAW [Mix B Input 01 Playback Volume]"
        );
        assert_eq!(gangs[0].unit(), DisplayUnit::Db);
        assert_eq!(gangs[0].taper(), Taper::Decibel { range_db: 60.0 });
        assert!(gangs[0].has_levels());
        assert_eq!(gangs[0].current_value(), 1000);

        assert_eq!(gangs[1].unit(), DisplayUnit::Raw);
        assert_eq!(gangs[1].mode(), GangMode::Scaled);
        assert_eq!(gangs[1].current_value(), 500);
        assert_eq!(card.total_writes(), 0);
    }

    #[test]
    fn test_missing_control() {
        let card = card();
        let config = session(vec![
            gang_config("DAW", &["Mix A Input 01 Playback Volume"], &[]),
            gang_config("Broken", &["Mix C Input 02 Playback Volume", "Nope"], &[]),
        ]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        match err {
            MixerError::Resolution {
                gang_index,
                gang_name,
                role,
                entry_index,
                parameter,
                reason,
            } => {
                assert_eq!(gang_index, 1);
                assert_eq!(gang_name, "Broken");
                assert_eq!(role, EntryRole::Control);
                assert_eq!(entry_index, 1);
                assert_eq!(parameter, "Nope");
                assert_eq!(
                    reason,
                    ResolveFailure::NotFound(ProviderError::NotFound("Nope".into()))
                );
            }
            other => panic!("Expected Resolution error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_level() {
        let card = card();
        let config = session(vec![gang_config(
            "DAW",
            &["Mix A Input 01 Playback Volume"],
            &["Level Meter 1", "Level Meter 9"],
        )]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        assert!(matches!(
            err,
            MixerError::Resolution { role: EntryRole::Level, entry_index: 1, .. }
        ));
        assert_eq!(
            err.to_string(),
            "gang 0 (DAW), level 1 (Level Meter 9): not found on hardware: parameter not found: Level Meter 9"
        );
    }

    #[test]
    fn test_unsupported_kind() {
        let card = card();
        let config = session(vec![gang_config("Phantom", &["Phantom Power"], &[])]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        assert!(matches!(
            err,
            MixerError::Resolution {
                reason: ResolveFailure::UnsupportedKind(ParamKind::Boolean),
                ..
            }
        ));
    }

    #[test]
    fn test_read_only_control_rejected() {
        let card = card();
        let config = session(vec![gang_config("Meter", &["Level Meter 1"], &[])]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        assert!(matches!(
            err,
            MixerError::Resolution { reason: ResolveFailure::ReadOnly, .. }
        ));
    }

    #[test]
    fn test_init_failure_aborts() {
        let card = card();
        card.fail_reads("Mix B Input 01 Playback Volume", true);
        let config = session(vec![gang_config(
            "DAW",
            &["Mix A Input 01 Playback Volume", "Mix B Input 01 Playback Volume"],
            &[],
        )]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        assert!(matches!(err, MixerError::Init { ref parameter, .. } if parameter == "Mix B Input 01 Playback Volume"));
    }

    #[test]
    fn test_empty_gang_is_config_error() {
        let card = card();
        let config = session(vec![gang_config("Empty", &[], &[])]);

        let err = ControlMapper::new(&card, &config).load_gangs().unwrap_err();
        assert!(matches!(err, MixerError::Config { .. }));
    }

    #[test]
    fn test_shared_parameter_allowed() {
        let card = card();
        let config = session(vec![
            gang_config("A", &["Mix A Input 01 Playback Volume"], &[]),
            gang_config("B", &["Mix A Input 01 Playback Volume"], &[]),
        ]);

        let gangs = ControlMapper::new(&card, &config).load_gangs().unwrap();
        assert_eq!(gangs.len(), 2);
    }
}

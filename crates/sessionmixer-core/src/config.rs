//! Session configuration
//!
//! Describes which hardware parameters are ganged behind which fader. Stored
//! as YAML, by default at `~/.config/sessionmixer/session.yaml`.
//!
//! ```yaml
//! card: 1
//! gangs:
//!   - name: "DAW"
//!     controls:
//!       - "Mix A Input 01 Playback Volume"
//!       - "Mix B Input 01 Playback Volume"
//!     taper_db: 72
//!     levels: ["Level Meter 1", "Level Meter 2"]
//! ```

use crate::error::{MixerError, MixerResult};
use crate::gang::GangMode;
use crate::taper::DisplayUnit;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level session configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Sound card index the provider should open
    pub card: u32,
    /// One entry per fader, in display order
    #[serde(default, alias = "gang_controls")]
    pub gangs: Vec<GangConfig>,
}

/// One fader and the parameters it drives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GangConfig {
    pub name: String,
    /// Hardware parameter names; all receive the same value
    pub controls: Vec<String>,
    /// Display unit; defaults to dB when `taper_db` is set, raw otherwise
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<DisplayUnit>,
    /// Decibel range shown by the fader (positive)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub taper_db: Option<f32>,
    /// Read-only level meters used to color the fader
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub levels: Vec<String>,
    #[serde(default)]
    pub mode: GangMode,
}

impl GangConfig {
    /// Display unit after applying the defaulting rule
    pub fn display_unit(&self) -> DisplayUnit {
        DisplayUnit::resolve(self.unit, self.taper_db)
    }
}

impl SessionConfig {
    /// Check the structure before anything touches hardware
    pub fn validate(&self) -> MixerResult<()> {
        for gang in &self.gangs {
            if gang.name.trim().is_empty() {
                return Err(MixerError::config(&gang.name, "gang name must not be empty"));
            }
            if gang.controls.is_empty() {
                return Err(MixerError::config(&gang.name, "gang must have at least 1 control"));
            }
            if let Some(taper_db) = gang.taper_db {
                if !taper_db.is_finite() || taper_db <= 0.0 {
                    return Err(MixerError::config(
                        &gang.name,
                        format!("taper_db must be positive, got {}", taper_db),
                    ));
                }
            }
        }

        if self.gangs.is_empty() {
            log::warn!("Session config defines no gangs");
        }
        Ok(())
    }
}

/// Default path of the session configuration
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("sessionmixer")
        .join("session.yaml")
}

/// Load and validate a session configuration
///
/// A missing or invalid file is an error. Without gang definitions there is
/// nothing to control.
pub fn load_config(path: &Path) -> Result<SessionConfig> {
    log::info!("load_config: Loading from {:?}", path);

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read session config: {:?}", path))?;

    let config: SessionConfig = serde_yaml::from_str(&contents)
        .with_context(|| format!("Failed to parse session config: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid session config: {:?}", path))?;

    log::info!(
        "load_config: Loaded {} gang(s) for card {}",
        config.gangs.len(),
        config.card
    );
    for gang in &config.gangs {
        log::info!(
            "  - {} ({} control(s), {} level(s), {})",
            gang.name,
            gang.controls.len(),
            gang.levels.len(),
            gang.display_unit()
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"
card: 1
gangs:
  - name: "DAW"
    controls:
      - "Mix A Input 01 Playback Volume"
      - "Mix B Input 01 Playback Volume"
    taper_db: 72
    levels: ["Level Meter 1", "Level Meter 2"]
  - name: "Phones"
    controls: ["Mix C Input 02 Playback Volume"]
    unit: raw
    mode: relative
"#;

    fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.yaml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_session() {
        let config: SessionConfig = serde_yaml::from_str(SESSION).unwrap();
        assert_eq!(config.card, 1);
        assert_eq!(config.gangs.len(), 2);

        let daw = &config.gangs[0];
        assert_eq!(daw.controls.len(), 2);
        assert_eq!(daw.taper_db, Some(72.0));
        assert_eq!(daw.levels, vec!["Level Meter 1", "Level Meter 2"]);
        assert_eq!(daw.mode, GangMode::Mirror);
        assert_eq!(daw.display_unit(), DisplayUnit::Db);

        let phones = &config.gangs[1];
        assert_eq!(phones.display_unit(), DisplayUnit::Raw);
        assert_eq!(phones.mode, GangMode::Relative);
        assert!(phones.levels.is_empty());
    }

    #[test]
    fn test_gang_controls_alias() {
        let yaml = r#"
card: 0
gang_controls:
  - name: "Main"
    controls: ["Volume"]
"#;
        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.gangs.len(), 1);
        assert_eq!(config.gangs[0].name, "Main");
    }

    #[test]
    fn test_card_is_required() {
        let yaml = r#"
gangs:
  - name: "Main"
    controls: ["Volume"]
"#;
        let err = serde_yaml::from_str::<SessionConfig>(yaml).unwrap_err();
        assert!(err.to_string().contains("card"));

        let (_dir, path) = write_config(yaml);
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_validate_rejects_empty_controls() {
        let yaml = r#"
card: 1
gangs:
  - name: "Empty"
    controls: []
"#;
        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(MixerError::Config { ref gang, .. }) if gang == "Empty"
        ));
    }

    #[test]
    fn test_validate_rejects_bad_taper() {
        let yaml = r#"
card: 1
gangs:
  - name: "DAW"
    controls: ["Volume"]
    taper_db: -6
"#;
        let config: SessionConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_config() {
        let (_dir, path) = write_config(SESSION);
        let config = load_config(&path).unwrap();
        assert_eq!(config.gangs[1].name, "Phones");
    }

    #[test]
    fn test_load_missing_file_fails() {
        let err = load_config(Path::new("/nonexistent/path/session.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read session config"));
    }

    #[test]
    fn test_load_invalid_yaml_fails() {
        let (_dir, path) = write_config("gangs: [name: ");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse session config"));
    }

    #[test]
    fn test_load_invalid_config_fails() {
        let (_dir, path) = write_config("card: 1\ngangs:\n  - name: \"\"\n    controls: [\"Volume\"]\n");
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Invalid session config"));
        assert!(err.root_cause().to_string().contains("must not be empty"));
    }

    #[test]
    fn test_default_path() {
        let path = default_config_path();
        assert!(path.ends_with(".config/sessionmixer/session.yaml"));
    }
}

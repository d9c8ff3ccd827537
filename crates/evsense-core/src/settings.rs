// Evsense Settings Module
// Environment and file configuration for the input subsystem

use std::path::{Path, PathBuf};

use crate::hotplug::DEFAULT_SCAN_DIR;

pub const ENV_SCANDIR: &str = "EVSENSE_INPUT_SCANDIR";
pub const ENV_TTYOVERRIDE: &str = "EVSENSE_INPUT_TTYOVERRIDE";
pub const ENV_NOMUTETTY: &str = "EVSENSE_INPUT_NOMUTETTY";
pub const ENV_VERBOSE: &str = "EVSENSE_INPUT_VERBOSE";

/// Environment variables the subsystem reads, with help text
pub const ENV_OPTIONS: &[(&str, &str)] = &[
    (ENV_NOMUTETTY, "Don't mute the terminal keyboard or ignore SIGINT"),
    (ENV_SCANDIR, "Directory to monitor for device nodes (default: /dev/input)"),
    (ENV_TTYOVERRIDE, "Force a specific tty device"),
    (ENV_VERBOSE, "Log discovery at warning level and enable debug logging"),
];

/// Errors that can occur when loading settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: String, value: String },
}

/// Settings for the input subsystem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSettings {
    /// Directory enumerated and watched for device nodes
    pub scan_dir: PathBuf,
    /// Terminal to take over instead of the detected one
    pub tty_override: Option<PathBuf>,
    /// Mute the terminal keyboard and switch it to graphics mode
    pub mute_tty: bool,
    /// Report per-device discovery at warning level
    pub verbose: bool,
    /// Device override table; `None` uses the default location
    pub overrides_path: Option<PathBuf>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            scan_dir: PathBuf::from(DEFAULT_SCAN_DIR),
            tty_override: None,
            mute_tty: true,
            verbose: false,
            overrides_path: None,
        }
    }
}

/// TOML representation for deserializing settings
#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct SettingsToml {
    #[serde(default)]
    input: Option<InputToml>,
}

#[derive(Debug, Clone, serde::Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct InputToml {
    scan_dir: Option<PathBuf>,
    tty: Option<PathBuf>,
    mute_tty: Option<bool>,
    verbose: Option<bool>,
    overrides: Option<PathBuf>,
}

impl InputSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the environment surface over the defaults
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::default().with_lookup(|name| std::env::var(name).ok())
    }

    /// Layer variables from `lookup` over these settings.
    ///
    /// Toggles count as set when present with an empty or truthy value.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_SCANDIR).filter(|v| !v.is_empty()) {
            self.scan_dir = PathBuf::from(dir);
        }
        if let Some(tty) = lookup(ENV_TTYOVERRIDE).filter(|v| !v.is_empty()) {
            self.tty_override = Some(PathBuf::from(tty));
        }
        if let Some(value) = lookup(ENV_NOMUTETTY) {
            self.mute_tty = !parse_toggle(ENV_NOMUTETTY, &value)?;
        }
        if let Some(value) = lookup(ENV_VERBOSE) {
            self.verbose = parse_toggle(ENV_VERBOSE, &value)?;
        }
        Ok(self)
    }

    /// Load settings from TOML string
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let file: SettingsToml =
            toml::from_str(content).map_err(|e| SettingsError::TomlParse(e.to_string()))?;

        let mut settings = Self::new();
        if let Some(input) = file.input {
            if let Some(dir) = input.scan_dir {
                settings.scan_dir = dir;
            }
            settings.tty_override = input.tty;
            if let Some(mute) = input.mute_tty {
                settings.mute_tty = mute;
            }
            if let Some(verbose) = input.verbose {
                settings.verbose = verbose;
            }
            settings.overrides_path = input.overrides;
        }
        Ok(settings)
    }

    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml(&content)
    }

    /// Get the default settings path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("evsense").join("settings.toml"))
    }

    /// Default file (if present) with the environment layered on top
    pub fn load() -> Result<Self, SettingsError> {
        let base = match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::new(),
        };
        base.with_lookup(|name| std::env::var(name).ok())
    }
}

fn parse_toggle(name: &str, value: &str) -> Result<bool, SettingsError> {
    match value.trim().to_lowercase().as_str() {
        "" | "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(SettingsError::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Create default settings content for a new installation
pub fn default_settings_content() -> &'static str {
    r#"# Evsense Settings
# Place this file at: ~/.config/evsense/settings.toml
# Environment variables override anything set here.

[input]
scan_dir = "/dev/input"
# tty = "/dev/tty2"
mute_tty = true
verbose = false
# overrides = "/etc/evsense/devices.toml"
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_settings_default() {
        let settings = InputSettings::new();
        assert_eq!(settings.scan_dir, PathBuf::from("/dev/input"));
        assert!(settings.mute_tty);
        assert!(!settings.verbose);
        assert!(settings.tty_override.is_none());
    }

    #[test]
    fn test_env_overrides() {
        let settings = InputSettings::new()
            .with_lookup(env(&[
                (ENV_SCANDIR, "/tmp/input"),
                (ENV_TTYOVERRIDE, "/dev/tty3"),
                (ENV_NOMUTETTY, ""),
                (ENV_VERBOSE, "yes"),
            ]))
            .unwrap();
        assert_eq!(settings.scan_dir, PathBuf::from("/tmp/input"));
        assert_eq!(settings.tty_override, Some(PathBuf::from("/dev/tty3")));
        assert!(!settings.mute_tty);
        assert!(settings.verbose);
    }

    #[test]
    fn test_env_false_values() {
        let settings = InputSettings::new()
            .with_lookup(env(&[(ENV_NOMUTETTY, "0"), (ENV_VERBOSE, "off")]))
            .unwrap();
        assert!(settings.mute_tty);
        assert!(!settings.verbose);
    }

    #[test]
    fn test_env_invalid_toggle() {
        let err = InputSettings::new()
            .with_lookup(env(&[(ENV_VERBOSE, "loud")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_settings_from_toml() {
        let settings = InputSettings::from_toml(default_settings_content()).unwrap();
        assert_eq!(settings, InputSettings::default());

        let settings = InputSettings::from_toml("[input]\ntty = \"/dev/tty5\"\nverbose = true\n").unwrap();
        assert_eq!(settings.tty_override, Some(PathBuf::from("/dev/tty5")));
        assert!(settings.verbose);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(matches!(
            InputSettings::from_toml("[input]\nscandir = \"/x\"\n"),
            Err(SettingsError::TomlParse(_))
        ));
    }

    #[test]
    fn test_env_table_lists_every_variable() {
        let names: Vec<&str> = ENV_OPTIONS.iter().map(|(name, _)| *name).collect();
        for name in [ENV_SCANDIR, ENV_TTYOVERRIDE, ENV_NOMUTETTY, ENV_VERBOSE] {
            assert!(names.contains(&name));
        }
    }
}

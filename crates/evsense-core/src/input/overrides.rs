// Evsense Input Layer - Device Overrides
// Static name-based table that bypasses the classification heuristic

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;

use crate::device::{DecodeMasks, Decoder, DeviceKind};

/// Errors that can occur when loading the override table
#[derive(Debug, thiserror::Error)]
pub enum OverrideError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Override entry {0} needs exactly one of `name` or `pattern`")]
    Matcher(usize),

    #[error("Invalid pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// What an override entry forces onto a matching device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOverride {
    pub kind: DeviceKind,
    pub decoder: Decoder,
    pub masks: DecodeMasks,
}

impl DeviceOverride {
    pub fn new(kind: DeviceKind) -> Self {
        Self {
            kind,
            decoder: Decoder::for_kind(kind),
            masks: DecodeMasks {
                digital_hats: kind == DeviceKind::Game,
                ..DecodeMasks::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideFile {
    #[serde(default)]
    device: Vec<OverrideEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OverrideEntry {
    name: Option<String>,
    pattern: Option<String>,
    kind: DeviceKind,
    decoder: Option<Decoder>,
    #[serde(default)]
    button_mask: u64,
    #[serde(default)]
    axis_mask: u64,
    digital_hats: Option<bool>,
}

impl OverrideEntry {
    fn resolve(&self) -> DeviceOverride {
        let base = DeviceOverride::new(self.kind);
        DeviceOverride {
            kind: self.kind,
            decoder: self.decoder.unwrap_or(base.decoder),
            masks: DecodeMasks {
                button_mask: self.button_mask,
                axis_mask: self.axis_mask,
                digital_hats: self.digital_hats.unwrap_or(base.masks.digital_hats),
            },
        }
    }
}

/// Label-keyed override lookup.
///
/// Exact names are checked first, then patterns in file order.
#[derive(Debug, Default)]
pub struct OverrideTable {
    exact: IndexMap<String, DeviceOverride>,
    patterns: Vec<(Regex, DeviceOverride)>,
    source_path: Option<PathBuf>,
}

impl OverrideTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from TOML text
    pub fn from_toml(content: &str) -> Result<Self, OverrideError> {
        let file: OverrideFile =
            toml::from_str(content).map_err(|e| OverrideError::TomlParse(e.to_string()))?;

        let mut table = Self::new();
        for (index, entry) in file.device.iter().enumerate() {
            let resolved = entry.resolve();
            match (&entry.name, &entry.pattern) {
                (Some(name), None) => table.insert(name, resolved),
                (None, Some(pattern)) => {
                    let regex = Regex::new(pattern).map_err(|source| OverrideError::Pattern {
                        pattern: pattern.clone(),
                        source,
                    })?;
                    table.patterns.push((regex, resolved));
                }
                _ => return Err(OverrideError::Matcher(index)),
            }
        }
        Ok(table)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OverrideError> {
        let content = fs::read_to_string(&path)?;
        let mut table = Self::from_toml(&content)?;
        table.source_path = Some(path.as_ref().to_path_buf());
        Ok(table)
    }

    /// Default table location (~/.config/evsense/devices.toml)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("evsense").join("devices.toml"))
    }

    /// Load from the default location; a missing file is an empty table
    pub fn load_default() -> Result<Self, OverrideError> {
        if let Some(path) = Self::default_path() {
            if path.exists() {
                return Self::from_file(path);
            }
        }
        Ok(Self::new())
    }

    /// Add or replace an exact-name entry
    pub fn insert(&mut self, name: &str, entry: DeviceOverride) {
        self.exact.insert(name.to_string(), entry);
    }

    pub fn lookup(&self, label: &str) -> Option<&DeviceOverride> {
        self.exact.get(label).or_else(|| {
            self.patterns
                .iter()
                .find(|(regex, _)| regex.is_match(label))
                .map(|(_, entry)| entry)
        })
    }

    pub fn len(&self) -> usize {
        self.exact.len() + self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// Example override file written by `evsense --env-help`
pub fn example_overrides_content() -> &'static str {
    r#"# Evsense device overrides
# Each entry matches a device label exactly (name) or by regex (pattern).

[[device]]
name = "Microsoft X-Box 360 pad"
kind = "game"
digital_hats = true

[[device]]
pattern = "^Logitech .* Wheel$"
kind = "game"
axis_mask = 0x0c          # ignore ABS_Z and ABS_RX

[[device]]
name = "Power Button"
kind = "keyboard"
decoder = "null"
"#
}

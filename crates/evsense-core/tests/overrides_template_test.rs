use std::fs;

use evsense_core::device::{Decoder, DeviceKind};
use evsense_core::input::overrides::{example_overrides_content, OverrideError, OverrideTable};
use evsense_core::settings::{default_settings_content, InputSettings};

#[test]
fn overrides_template_loads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("devices.toml");
    fs::write(&path, example_overrides_content()).unwrap();

    let table = OverrideTable::from_file(&path).expect("failed to parse template overrides");
    assert_eq!(table.len(), 3);
    assert_eq!(table.source_path(), Some(path.as_path()));

    let wheel = table.lookup("Logitech G29 Driving Force Racing Wheel").unwrap();
    assert_eq!(wheel.kind, DeviceKind::Game);
    assert_eq!(wheel.masks.axis_mask, 0x0c);

    let power = table.lookup("Power Button").unwrap();
    assert_eq!(power.decoder, Decoder::Null);
    assert!(table.lookup("Power Button 2").is_none());
}

#[test]
fn settings_template_points_at_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.toml");
    let content = default_settings_content().replace(
        "# overrides = \"/etc/evsense/devices.toml\"",
        "overrides = \"/etc/evsense/devices.toml\"",
    );
    fs::write(&path, content).unwrap();

    let settings = InputSettings::from_file(&path).unwrap();
    assert_eq!(
        settings.overrides_path.as_deref(),
        Some(std::path::Path::new("/etc/evsense/devices.toml"))
    );
    assert!(settings.mute_tty);
}

#[test]
fn broken_pattern_is_reported() {
    let err = OverrideTable::from_toml("[[device]]\npattern = \"(\"\nkind = \"game\"\n").unwrap_err();
    assert!(matches!(err, OverrideError::Pattern { .. }));
}

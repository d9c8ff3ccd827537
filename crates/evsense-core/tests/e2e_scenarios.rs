// Evsense End-to-End Test Scenarios
//
// Session lifecycles without hardware: hot-plug, unplug and reconnect,
// overrides, and terminal takeover with teardown.

mod common;

use std::fs;

use common::*;
use evsense_core::console::{KD_GRAPHICS, KD_TEXT, K_OFF, K_UNICODE};
use evsense_core::device::DeviceKind;
use evsense_core::event::InputEvent;
use evsense_core::input::event::*;
use evsense_core::input::overrides::OverrideTable;
use evsense_core::registry::Slot;
use evsense_core::{EventBatch, InputContext, InputSettings};

fn settings(dir: &tempfile::TempDir) -> InputSettings {
    InputSettings {
        scan_dir: dir.path().to_path_buf(),
        ..InputSettings::default()
    }
}

fn poll(context: &mut InputContext) -> Vec<InputEvent> {
    let mut events = Vec::new();
    context.process(&mut events).unwrap();
    events
}

#[test]
fn test_hotplug_adds_device_after_scan() {
    let dir = tempfile::tempdir().unwrap();
    let opener = MockOpener::default();
    let (watch, mut announcer) = mock_watch();
    let mut context = InputContext::new(settings(&dir), Box::new(opener.clone()))
        .with_watch(Box::new(watch));
    assert!(context.has_watch());
    assert_eq!(context.rescan().unwrap(), 0);

    let (source, mut pad) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event5", source);
    announcer.created("event5");
    assert!(poll(&mut context).is_empty());

    let devices = context.list_devices();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].kind, DeviceKind::Game);
    assert!(devices[0].path.ends_with("event5"));

    pad.send(vec![RawEvent::key(BTN_GAMEPAD, 1)]);
    assert_eq!(poll(&mut context).len(), 1);
}

#[test]
fn test_unplug_and_reconnect_reuses_slot() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();
    fs::write(dir.path().join("event1"), b"").unwrap();

    let opener = MockOpener::default();
    let (source, _keyboard) = pipe_source("USB Keyboard", keyboard_caps());
    opener.add("event0", source);
    let (source, mut pad) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event1", source);

    let (watch, mut announcer) = mock_watch();
    let mut context = InputContext::new(settings(&dir), Box::new(opener.clone()))
        .with_watch(Box::new(watch));
    context.rescan().unwrap();
    let pad_id = context.registry().get(1).unwrap().id();

    pad.unplug();
    assert!(poll(&mut context).is_empty());
    assert_eq!(context.registry().live(), 1);
    assert!(matches!(
        context.registry().slot(1),
        Some(Slot::Vacated { id }) if *id == pad_id
    ));
    assert_eq!(context.lookup(i32::from(pad_id)), None);

    let (source, mut pad) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event1", source);
    announcer.created("event1");
    poll(&mut context);

    assert_eq!(context.registry().live(), 2);
    assert_eq!(context.lookup(i32::from(pad_id)), Some(1));

    pad.send(vec![RawEvent::abs(ABS_HAT0Y, 1)]);
    let events = poll(&mut context);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].device, pad_id);
}

#[test]
fn test_reappearing_live_device_keeps_state() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();

    let opener = MockOpener::default();
    let (source, mut first) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event0", source);
    let (watch, mut announcer) = mock_watch();
    let mut context = InputContext::new(settings(&dir), Box::new(opener.clone()))
        .with_watch(Box::new(watch));
    context.rescan().unwrap();

    first.send(vec![RawEvent::abs(ABS_HAT0X, 1)]);
    assert_eq!(poll(&mut context).len(), 1);

    let (source, mut second) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event0", source);
    announcer.created("event0");
    poll(&mut context);
    assert_eq!(context.registry().live(), 1);

    // The held pole survives the source swap, so centering releases it
    second.send(vec![RawEvent::abs(ABS_HAT0X, 0)]);
    let events = poll(&mut context);
    assert_eq!(events.len(), 1);
    assert!(!events[0].as_button().unwrap().active);
}

#[test]
fn test_override_masks_and_hats() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();

    let overrides = OverrideTable::from_toml(
        r#"
        [[device]]
        pattern = "X-Box"
        kind = "game"
        button_mask = 0x10000
        digital_hats = false
        "#,
    )
    .unwrap();

    let opener = MockOpener::default();
    let (source, mut pad) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event0", source);
    let mut context =
        InputContext::new(settings(&dir), Box::new(opener)).with_overrides(overrides);
    context.rescan().unwrap();

    pad.send(vec![
        RawEvent::key(BTN_GAMEPAD, 1),
        RawEvent::key(BTN_GAMEPAD + 1, 1),
        RawEvent::abs(ABS_HAT0X, 1),
    ]);
    let events = poll(&mut context);
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_button().unwrap().subid, 17);
    let hat = events[1].as_axis().unwrap();
    assert_eq!((hat.subid, hat.values()), (2, &[1][..]));
}

#[test]
fn test_override_can_force_kind() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();

    let overrides = OverrideTable::from_toml(
        r#"
        [[device]]
        name = "Power Button"
        kind = "keyboard"
        decoder = "null"
        "#,
    )
    .unwrap();
    let opener = MockOpener::default();
    let (source, mut button) = pipe_source(
        "Power Button",
        evsense_core::input::capabilities::DeviceCapabilities::new().with_keys([116]),
    );
    opener.add("event0", source);
    let mut context =
        InputContext::new(settings(&dir), Box::new(opener)).with_overrides(overrides);
    context.rescan().unwrap();

    assert_eq!(context.list_devices()[0].kind, DeviceKind::Keyboard);
    button.send(vec![RawEvent::key(116, 1)]);
    assert!(poll(&mut context).is_empty());
}

#[test]
fn test_override_file_applies_to_session() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();
    let table_path = dir.path().join("devices.toml");
    fs::write(
        &table_path,
        r#"
        [[device]]
        name = "USB Keyboard"
        kind = "sensor"
        "#,
    )
    .unwrap();

    let overrides = OverrideTable::from_file(&table_path).unwrap();
    assert_eq!(overrides.source_path(), Some(table_path.as_path()));

    let opener = MockOpener::default();
    let (source, _keyboard) = pipe_source("USB Keyboard", keyboard_caps());
    opener.add("event0", source);
    let mut context =
        InputContext::new(settings(&dir), Box::new(opener)).with_overrides(overrides);
    assert_eq!(context.rescan().unwrap(), 1);
    assert_eq!(context.list_devices()[0].kind, DeviceKind::Sensor);
}

#[test]
fn test_terminal_taken_over_and_restored() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();

    let opener = MockOpener::default();
    let (source, _keyboard) = pipe_source("USB Keyboard", keyboard_caps());
    opener.add("event0", source);
    let (console, terminal) = mock_console();
    let mut context = InputContext::new(settings(&dir), Box::new(opener.clone()))
        .with_console(Box::new(console));
    context.rescan().unwrap();

    assert!(context.is_muted());
    {
        let tty = terminal.borrow();
        assert!(tty.muted);
        assert_eq!((tty.display, tty.keyboard, tty.leds), (KD_GRAPHICS, K_OFF, 0));
    }

    terminal.borrow_mut().calls.clear();
    context.shutdown();
    {
        let tty = terminal.borrow();
        assert_eq!(tty.calls, vec!["display", "keyboard", "mute", "leds"]);
        assert!(!tty.muted);
        assert_eq!((tty.display, tty.keyboard, tty.leds), (KD_TEXT, K_UNICODE, 0b100));
    }
    assert!(!context.is_muted());
    assert!(context.registry().is_empty());

    context.shutdown();
    assert_eq!(terminal.borrow().calls.len(), 4);

    // A shut down context scans again when asked
    let (source, _keyboard) = pipe_source("USB Keyboard", keyboard_caps());
    opener.add("event0", source);
    assert_eq!(context.rescan().unwrap(), 1);
}

#[test]
fn test_unmuted_session_leaves_keyboard_alone() {
    let dir = tempfile::tempdir().unwrap();
    let (console, terminal) = mock_console();
    let settings = InputSettings {
        mute_tty: false,
        ..settings(&dir)
    };
    let context = InputContext::new(settings, Box::new(MockOpener::default()))
        .with_console(Box::new(console));
    assert!(!context.is_muted());
    drop(context);

    let tty = terminal.borrow();
    assert_eq!(tty.calls, vec!["leds", "leds"]);
    assert_eq!(tty.keyboard, K_UNICODE);
}

#[test]
fn test_batch_limit_counts_overflow() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("event0"), b"").unwrap();
    let opener = MockOpener::default();
    let (source, mut pad) = pipe_source("Generic X-Box pad", pad_caps());
    opener.add("event0", source);
    let mut context = InputContext::new(settings(&dir), Box::new(opener));
    context.rescan().unwrap();

    pad.send((0..6).map(|i| RawEvent::key(BTN_GAMEPAD, i % 2)).collect());
    let mut batch = EventBatch::with_limit(4);
    context.process(&mut batch).unwrap();
    assert_eq!(batch.len(), 4);
    assert_eq!(batch.dropped(), 2);
}

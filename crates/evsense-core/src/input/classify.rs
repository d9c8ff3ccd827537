// Evsense Input Layer - Device Classification
// Decides a device's kind and commits the matching per-kind state

use crate::device::{
    CursorState, DecodeMasks, Decoder, DeviceKind, GameState, KeyboardState, Payload, SensorState,
};
use crate::input::capabilities::ProbeReport;
use crate::input::overrides::DeviceOverride;

/// Button count above which a device without mouse or joystick buttons is
/// taken for a keyboard. Empirical; tune if full-size pads start tripping it.
pub const KEYBOARD_BUTTON_THRESHOLD: usize = 84;

/// Outcome of classifying one device
#[derive(Debug, Clone)]
pub struct Classification {
    pub decoder: Decoder,
    pub masks: DecodeMasks,
    pub payload: Payload,
}

impl Classification {
    pub fn kind(&self) -> DeviceKind {
        self.payload.kind()
    }
}

/// Pick a kind from capability facts alone.
///
/// 1. relative X/Y pair plus mouse buttons is a mouse
/// 2. no mouse or joystick buttons and more than
///    `KEYBOARD_BUTTON_THRESHOLD` buttons is a keyboard
/// 3. everything else is a game device
pub fn heuristic_kind(report: &ProbeReport) -> DeviceKind {
    if report.has_relative_pair && report.has_mouse_buttons {
        DeviceKind::Mouse
    } else if !report.has_mouse_buttons
        && !report.has_joystick_buttons
        && report.button_count > KEYBOARD_BUTTON_THRESHOLD
    {
        DeviceKind::Keyboard
    } else {
        DeviceKind::Game
    }
}

/// Build the state layout for a kind, consuming the probed axes
pub fn payload_for(kind: DeviceKind, report: ProbeReport) -> Payload {
    match kind {
        DeviceKind::Game => Payload::Game(GameState::new(report.button_count, report.axes)),
        DeviceKind::Mouse => Payload::Mouse(CursorState::default()),
        DeviceKind::Keyboard => Payload::Keyboard(KeyboardState::default()),
        DeviceKind::Sensor => Payload::Sensor(SensorState {
            filter: report
                .axes
                .into_iter()
                .next()
                .map(|slot| slot.filter)
                .unwrap_or_default(),
        }),
        DeviceKind::Touch => Payload::Touch,
        DeviceKind::Unclassified => Payload::Unclassified,
    }
}

/// Classify a probed device. A matching override wins outright.
pub fn classify(report: ProbeReport, entry: Option<&DeviceOverride>) -> Classification {
    let resolved = match entry {
        Some(entry) => *entry,
        None => DeviceOverride::new(heuristic_kind(&report)),
    };

    Classification {
        decoder: resolved.decoder,
        masks: resolved.masks,
        payload: payload_for(resolved.kind, report),
    }
}

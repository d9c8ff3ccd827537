// Evsense Decoders - Keyboard
// Key reports to translated button events with modifier and lock tracking

use crate::action::Action;
use crate::device::{DeviceKind, KeyboardState};
use crate::event::{Button, EventData, EventSink, InputEvent, Translation};
use crate::input::event::RawEvent;
use crate::key::{character_for, keysym_for};

/// Decode one batch of keyboard reports.
///
/// Every key report becomes a translated button event. Autorepeat is sent
/// as a release immediately followed by a press.
pub fn decode(device: u16, state: &mut KeyboardState, reports: &[RawEvent], sink: &mut dyn EventSink) {
    for report in reports.iter().filter(|r| r.is_key()) {
        let action = Action::from_value(report.value);
        if action == Action::Press {
            state.locks.toggle(report.code);
        }
        state.modifiers.update(report.code, action.is_pressed());

        let translation = Translation {
            scancode: report.code,
            keysym: keysym_for(report.code),
            modifiers: state.modifiers,
        };
        let subid = character_for(report.code, state.modifiers, state.locks);

        for active in action.edges() {
            sink.push_event(InputEvent {
                device,
                kind: DeviceKind::Keyboard,
                data: EventData::Button(Button {
                    subid,
                    active,
                    translation: Some(translation),
                }),
            });
        }
    }
}

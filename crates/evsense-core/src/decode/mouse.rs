// Evsense Decoders - Mouse
// Button index mapping and clamped cursor accumulation

use crate::device::{CursorState, DeviceKind};
use crate::event::{Axis, EventSink, InputEvent};
use crate::input::event::{RawEvent, BTN_JOYSTICK, BTN_MOUSE, EV_KEY, EV_REL, REL_X, REL_Y};

/// Positional button index for a mouse button code (left is 1)
pub fn button_index(code: u16) -> Option<u16> {
    (BTN_MOUSE..BTN_JOYSTICK)
        .contains(&code)
        .then(|| code - BTN_MOUSE + 1)
}

/// Decode one batch of mouse reports.
pub fn decode(device: u16, state: &mut CursorState, reports: &[RawEvent], sink: &mut dyn EventSink) {
    for report in reports {
        match report.kind {
            EV_KEY => {
                if let Some(index) = button_index(report.code) {
                    sink.push_event(InputEvent::button(
                        device,
                        DeviceKind::Mouse,
                        index,
                        report.value != 0,
                    ));
                }
            }
            EV_REL => {
                let axis = match report.code {
                    REL_X => 0,
                    REL_Y => 1,
                    _ => continue,
                };
                let Some(delta) = state.filters[axis].sample(report.value) else {
                    continue;
                };
                let position = if axis == 0 { &mut state.x } else { &mut state.y };
                *position = position.saturating_add(delta).max(0);

                sink.push_event(InputEvent::axis(
                    device,
                    DeviceKind::Mouse,
                    Axis::relative(axis as u16, *position, report.value),
                ));
            }
            _ => {}
        }
    }
}

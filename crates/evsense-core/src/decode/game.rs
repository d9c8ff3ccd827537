// Evsense Decoders - Game Controllers
// Masked buttons, digital hats and filtered analog axes

use crate::decode::hat::decode_hat;
use crate::device::{DecodeMasks, DeviceKind, GameState};
use crate::event::{Axis, EventSink, InputEvent};
use crate::input::event::{RawEvent, BTN_JOYSTICK, EV_ABS, EV_KEY};

/// Button sub-identifier: offset from the joystick block when the code is
/// inside it, the raw code otherwise
pub fn button_index(code: u16) -> u16 {
    code.checked_sub(BTN_JOYSTICK).unwrap_or(code)
}

pub fn decode(
    device: u16,
    masks: &DecodeMasks,
    state: &mut GameState,
    reports: &[RawEvent],
    sink: &mut dyn EventSink,
) {
    for report in reports {
        match report.kind {
            EV_KEY => {
                let index = button_index(report.code);
                if masks.button_suppressed(index) {
                    continue;
                }
                sink.push_event(InputEvent::button(
                    device,
                    DeviceKind::Game,
                    index,
                    report.value != 0,
                ));
            }
            EV_ABS => {
                if masks.axis_suppressed(report.code) {
                    continue;
                }
                if masks.digital_hats && report.is_hat() {
                    for (subid, active) in decode_hat(&mut state.hats, report.code, report.value) {
                        sink.push_event(InputEvent::button(device, DeviceKind::Game, subid, active));
                    }
                    continue;
                }
                let Some(index) = state.axis_index(report.code) else {
                    continue;
                };
                if let Some(value) = state.axes[index].filter.sample(report.value) {
                    sink.push_event(InputEvent::axis(
                        device,
                        DeviceKind::Game,
                        Axis::absolute(index as u16, value),
                    ));
                }
            }
            _ => {}
        }
    }
}

// Evsense Decoders
// Raw kernel reports to normalized events, one decoder per device kind

pub mod game;
pub mod hat;
pub mod keyboard;
pub mod mouse;

use crate::device::{Decoder, DeviceNode, Payload};
use crate::event::EventSink;
use crate::input::event::RawEvent;

pub use hat::{decode_hat, HAT_SUBID_BASE};

/// Run a node's decoder over one batch of reports.
///
/// The null decoder, and any decoder whose state layout does not match the
/// node's payload, drains the batch without emitting.
pub fn decode(node: &mut DeviceNode, reports: &[RawEvent], sink: &mut dyn EventSink) {
    let device = node.id();
    let masks = node.masks;
    match (node.decoder, &mut node.payload) {
        (Decoder::Keyboard, Payload::Keyboard(state)) => keyboard::decode(device, state, reports, sink),
        (Decoder::Mouse, Payload::Mouse(state)) => mouse::decode(device, state, reports, sink),
        (Decoder::Game, Payload::Game(state)) => game::decode(device, &masks, state, reports, sink),
        (Decoder::Null, _) => {}
        (decoder, payload) => {
            log::trace!(
                "Device {} uses {} decoder over {} state, dropping {} reports",
                device,
                decoder,
                payload.kind(),
                reports.len()
            );
        }
    }
}

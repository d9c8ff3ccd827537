// Evsense Device Layer
// Event source seam, device kinds and the per-node state they carry

mod node;
#[cfg(feature = "pure-rust")]
pub mod evdev;

use std::io;
use std::os::unix::io::RawFd;
use std::path::Path;

use serde::Deserialize;
use strum_macros::{Display, EnumIter, EnumString};

use crate::input::bits::BitMask;
use crate::input::capabilities::DeviceCapabilities;
use crate::input::event::RawEvent;
use crate::input::identity::HardwareId;

pub use node::{
    CursorState, DecodeMasks, DeviceNode, GameState, KeyboardState, Payload, SensorState,
    HAT_SLOTS, LABEL_MAX,
};

/// Closed set of device kinds a node can be classified as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Game,
    Mouse,
    Sensor,
    Keyboard,
    Touch,
    Unclassified,
}

/// Report decoder assigned to a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Decoder {
    Keyboard,
    Mouse,
    Game,
    /// Drains reports without emitting anything
    Null,
}

impl Decoder {
    /// Default decoder for a device kind
    pub fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Keyboard => Decoder::Keyboard,
            DeviceKind::Mouse => Decoder::Mouse,
            DeviceKind::Game => Decoder::Game,
            DeviceKind::Sensor | DeviceKind::Touch | DeviceKind::Unclassified => Decoder::Null,
        }
    }
}

/// Keyboard autorepeat timing in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyRepeat {
    pub period: i32,
    pub delay: i32,
}

/// An open kernel input node.
///
/// Everything the subsystem needs from a device goes through this trait so
/// the registry and decoders never touch an ioctl directly. Dropping the
/// source closes its descriptor.
pub trait EventSource {
    /// Descriptor to include in the poll set
    fn raw_fd(&self) -> RawFd;

    /// Human-readable device name, if the device reports one
    fn name(&self) -> Option<String>;

    /// Vendor/product/version triple
    fn hardware_id(&self) -> io::Result<HardwareId>;

    /// Unique hardware string, if the device reports one
    fn unique_id(&self) -> Option<Vec<u8>>;

    /// Supported event types (EV_* bits)
    fn event_types(&self) -> io::Result<BitMask>;

    /// Full capability masks including absolute axis ranges
    fn capabilities(&self) -> io::Result<DeviceCapabilities>;

    /// Read one batch of reports into `out`.
    ///
    /// Returns the number of bytes the read produced; `Ok(0)` means the
    /// device went away.
    fn read_events(&mut self, out: &mut Vec<RawEvent>) -> io::Result<usize>;

    /// Take or release exclusive access to the node
    fn set_grab(&mut self, grab: bool) -> io::Result<()>;

    /// Push keyboard autorepeat timing to the node
    fn set_repeat(&mut self, repeat: KeyRepeat) -> io::Result<()>;
}

/// Opens scan-directory entries as event sources
pub trait DeviceOpener {
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn EventSource>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_every_kind_has_a_decoder() {
        for kind in DeviceKind::iter() {
            let decoder = Decoder::for_kind(kind);
            match kind {
                DeviceKind::Game => assert_eq!(decoder, Decoder::Game),
                DeviceKind::Mouse => assert_eq!(decoder, Decoder::Mouse),
                DeviceKind::Keyboard => assert_eq!(decoder, Decoder::Keyboard),
                _ => assert_eq!(decoder, Decoder::Null),
            }
        }
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(DeviceKind::Keyboard.to_string(), "keyboard");
        assert_eq!(DeviceKind::from_str("Mouse"), Ok(DeviceKind::Mouse));
        assert_eq!(Decoder::from_str("null"), Ok(Decoder::Null));
        assert!(DeviceKind::from_str("tablet").is_err());
    }
}

// Evsense Core Library
// Linux input device discovery, classification and decoding

pub mod action;
pub mod analog;
pub mod console;
pub mod context;
pub mod decode;
pub mod device;
pub mod event;
pub mod hotplug;
pub mod input;
pub mod key;
pub mod modifier;
pub mod registry;
pub mod settings;

#[cfg(test)]
mod testing;

pub use action::Action;
pub use analog::{AnalogConfig, AxisFilter, FilterMode};
pub use console::{Console, ConsoleError, TtySession, VtConsole};
pub use context::{DeviceError, DeviceInfo, InputContext, SessionError, SessionResult};
pub use device::{Decoder, DeviceKind, DeviceNode, DeviceOpener, EventSource, KeyRepeat};
pub use event::{Axis, Button, EventBatch, EventData, EventSink, InputCapabilities, InputEvent};
pub use hotplug::DirectoryWatch;
pub use input::{DeviceCapabilities, DeviceOverride, OverrideTable};
pub use key::KeySym;
pub use modifier::Modifiers;
pub use registry::{Registry, RegistryError};
pub use settings::{InputSettings, SettingsError};

#[cfg(feature = "pure-rust")]
pub use device::evdev::{EvdevOpener, EvdevSource};
#[cfg(feature = "pure-rust")]
pub use hotplug::InotifyWatch;

// Evsense Event Handling
// Normalized event records produced for the engine's event queue

pub mod batch;

use std::collections::VecDeque;
use std::fmt;

use bitflags::bitflags;

use crate::device::DeviceKind;
use crate::key::KeySym;
use crate::modifier::Modifiers;

pub use batch::{batch_config, EventBatch};

/// Keyboard detail attached to translated button events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Translation {
    /// Raw kernel key code
    pub scancode: u16,
    pub keysym: KeySym,
    /// Modifier mask after this report was applied
    pub modifiers: Modifiers,
}

/// Digital button edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Button {
    /// Button index, hat pole or character code depending on the device
    pub subid: u16,
    pub active: bool,
    pub translation: Option<Translation>,
}

/// Analog axis movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    /// Device-local axis index
    pub subid: u16,
    /// Filtered value, then raw delta for relative devices
    pub values: [i32; 2],
    /// How many entries of `values` are meaningful
    pub count: u8,
    pub relative: bool,
}

impl Axis {
    pub fn absolute(subid: u16, value: i32) -> Self {
        Self {
            subid,
            values: [value, 0],
            count: 1,
            relative: false,
        }
    }

    pub fn relative(subid: u16, position: i32, delta: i32) -> Self {
        Self {
            subid,
            values: [position, delta],
            count: 2,
            relative: true,
        }
    }

    pub fn values(&self) -> &[i32] {
        &self.values[..usize::from(self.count).min(2)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventData {
    Button(Button),
    Axis(Axis),
}

/// One normalized input occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputEvent {
    /// Stable id of the emitting device
    pub device: u16,
    pub kind: DeviceKind,
    pub data: EventData,
}

impl InputEvent {
    pub fn button(device: u16, kind: DeviceKind, subid: u16, active: bool) -> Self {
        Self {
            device,
            kind,
            data: EventData::Button(Button {
                subid,
                active,
                translation: None,
            }),
        }
    }

    pub fn axis(device: u16, kind: DeviceKind, axis: Axis) -> Self {
        Self {
            device,
            kind,
            data: EventData::Axis(axis),
        }
    }

    pub fn as_button(&self) -> Option<&Button> {
        match &self.data {
            EventData::Button(button) => Some(button),
            EventData::Axis(_) => None,
        }
    }

    pub fn as_axis(&self) -> Option<&Axis> {
        match &self.data {
            EventData::Axis(axis) => Some(axis),
            EventData::Button(_) => None,
        }
    }
}

impl fmt::Display for InputEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            EventData::Button(button) => {
                write!(
                    f,
                    "{}:{} button {} {}",
                    self.kind,
                    self.device,
                    button.subid,
                    if button.active { "down" } else { "up" }
                )?;
                if let Some(key) = &button.translation {
                    write!(
                        f,
                        " (scancode {}, sym {}, mods {:#06x})",
                        key.scancode,
                        key.keysym.value(),
                        key.modifiers.bits()
                    )?;
                }
                Ok(())
            }
            EventData::Axis(axis) => write!(
                f,
                "{}:{} axis {} {:?}{}",
                self.kind,
                self.device,
                axis.subid,
                axis.values(),
                if axis.relative { " rel" } else { "" }
            ),
        }
    }
}

/// Receiver of normalized events
pub trait EventSink {
    fn push_event(&mut self, event: InputEvent);
}

impl EventSink for Vec<InputEvent> {
    fn push_event(&mut self, event: InputEvent) {
        self.push(event);
    }
}

impl EventSink for VecDeque<InputEvent> {
    fn push_event(&mut self, event: InputEvent) {
        self.push_back(event);
    }
}

bitflags! {
    /// Input classes currently available from live devices
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct InputCapabilities: u32 {
        const TRANSLATED = 1 << 0;
        const MOUSE = 1 << 1;
        const GAMING = 1 << 2;
        const TOUCH = 1 << 3;
        const POSITION = 1 << 4;
        const ORIENTATION = 1 << 5;
    }
}

impl InputCapabilities {
    /// Classes a device of the given kind contributes
    pub fn for_kind(kind: DeviceKind) -> Self {
        match kind {
            DeviceKind::Keyboard => Self::TRANSLATED,
            DeviceKind::Mouse => Self::MOUSE,
            DeviceKind::Game => Self::GAMING,
            DeviceKind::Touch => Self::TOUCH,
            DeviceKind::Sensor => Self::POSITION | Self::ORIENTATION,
            DeviceKind::Unclassified => Self::empty(),
        }
    }
}

// Evsense Device Layer - Device Nodes
// One registered input source with its classification and decoder state

use std::fmt;

use crate::analog::{AxisFilter, FilterMode};
use crate::device::{Decoder, DeviceKind, EventSource};
use crate::input::capabilities::AxisSlot;
use crate::modifier::{LockState, Modifiers};

/// Longest label kept for a node, in bytes
pub const LABEL_MAX: usize = 255;

/// Entries in the hat table: two poles for each of the four hats
pub const HAT_SLOTS: usize = 16;

/// Per-node report suppression supplied by a device override
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodeMasks {
    /// Bit n set suppresses game button n
    pub button_mask: u64,
    /// Bit n set suppresses absolute axis code n
    pub axis_mask: u64,
    /// Decode hat axes as digital pole pairs
    pub digital_hats: bool,
}

impl DecodeMasks {
    pub fn button_suppressed(&self, index: u16) -> bool {
        index < 64 && (self.button_mask >> index) & 1 == 1
    }

    pub fn axis_suppressed(&self, code: u16) -> bool {
        code < 64 && (self.axis_mask >> code) & 1 == 1
    }
}

#[derive(Debug, Clone)]
pub struct GameState {
    pub buttons: usize,
    /// Axis filters in local index order, each tagged with its kernel code
    pub axes: Vec<AxisSlot>,
    /// Last reported pole per hat slot (-1, 0 or 1)
    pub hats: [i8; HAT_SLOTS],
}

impl GameState {
    pub fn new(buttons: usize, axes: Vec<AxisSlot>) -> Self {
        Self {
            buttons,
            axes,
            hats: [0; HAT_SLOTS],
        }
    }

    /// Local axis index for a kernel axis code
    pub fn axis_index(&self, code: u16) -> Option<usize> {
        self.axes.iter().position(|slot| slot.code == code)
    }
}

#[derive(Debug, Clone)]
pub struct CursorState {
    pub filters: [AxisFilter; 2],
    pub x: i32,
    pub y: i32,
}

impl Default for CursorState {
    fn default() -> Self {
        Self {
            filters: [
                AxisFilter::new(FilterMode::PassThrough),
                AxisFilter::new(FilterMode::PassThrough),
            ],
            x: 0,
            y: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    pub modifiers: Modifiers,
    pub locks: LockState,
}

#[derive(Debug, Clone, Default)]
pub struct SensorState {
    pub filter: AxisFilter,
}

/// Kind-specific node state. The variant is the node's kind.
#[derive(Debug, Clone)]
pub enum Payload {
    Game(GameState),
    Mouse(CursorState),
    Sensor(SensorState),
    Keyboard(KeyboardState),
    Touch,
    Unclassified,
}

impl Payload {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Payload::Game(_) => DeviceKind::Game,
            Payload::Mouse(_) => DeviceKind::Mouse,
            Payload::Sensor(_) => DeviceKind::Sensor,
            Payload::Keyboard(_) => DeviceKind::Keyboard,
            Payload::Touch => DeviceKind::Touch,
            Payload::Unclassified => DeviceKind::Unclassified,
        }
    }

    /// Filter state for a device-local axis id
    pub fn axis(&self, axis: usize) -> Option<&AxisFilter> {
        match self {
            Payload::Sensor(state) if axis == 0 => Some(&state.filter),
            Payload::Game(state) => state.axes.get(axis).map(|slot| &slot.filter),
            Payload::Mouse(state) => state.filters.get(axis),
            _ => None,
        }
    }

    pub fn axis_mut(&mut self, axis: usize) -> Option<&mut AxisFilter> {
        match self {
            Payload::Sensor(state) if axis == 0 => Some(&mut state.filter),
            Payload::Game(state) => state.axes.get_mut(axis).map(|slot| &mut slot.filter),
            Payload::Mouse(state) => state.filters.get_mut(axis),
            _ => None,
        }
    }

    /// Every filter this payload owns
    pub fn filters_mut(&mut self) -> Vec<&mut AxisFilter> {
        match self {
            Payload::Sensor(state) => vec![&mut state.filter],
            Payload::Game(state) => state.axes.iter_mut().map(|slot| &mut slot.filter).collect(),
            Payload::Mouse(state) => state.filters.iter_mut().collect(),
            _ => Vec::new(),
        }
    }
}

/// A live input node: its open source, identity and classified state.
pub struct DeviceNode {
    source: Box<dyn EventSource>,
    label: String,
    path: String,
    id: u16,
    pub decoder: Decoder,
    pub masks: DecodeMasks,
    pub payload: Payload,
}

impl DeviceNode {
    pub fn new(
        source: Box<dyn EventSource>,
        label: &str,
        path: &str,
        id: u16,
        decoder: Decoder,
        payload: Payload,
    ) -> Self {
        Self {
            source,
            label: bounded_label(label),
            path: path.to_string(),
            id,
            decoder,
            masks: DecodeMasks::default(),
            payload,
        }
    }

    pub fn with_masks(mut self, masks: DecodeMasks) -> Self {
        self.masks = masks;
        self
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> DeviceKind {
        self.payload.kind()
    }

    pub fn source(&self) -> &dyn EventSource {
        self.source.as_ref()
    }

    pub fn source_mut(&mut self) -> &mut dyn EventSource {
        self.source.as_mut()
    }

    /// Consume the node, keeping only its open source
    pub fn into_source(self) -> Box<dyn EventSource> {
        self.source
    }

    /// Swap in a freshly opened source for the same physical device,
    /// returning the old one so the caller decides when it closes.
    pub fn replace_source(
        &mut self,
        source: Box<dyn EventSource>,
        path: &str,
    ) -> Box<dyn EventSource> {
        self.path = path.to_string();
        std::mem::replace(&mut self.source, source)
    }
}

impl fmt::Debug for DeviceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceNode")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("path", &self.path)
            .field("kind", &self.kind())
            .field("decoder", &self.decoder)
            .field("fd", &self.source.raw_fd())
            .finish()
    }
}

/// Truncate a label to `LABEL_MAX` bytes on a char boundary
fn bounded_label(label: &str) -> String {
    if label.len() <= LABEL_MAX {
        return label.to_string();
    }
    let mut end = LABEL_MAX;
    while !label.is_char_boundary(end) {
        end -= 1;
    }
    label[..end].to_string()
}

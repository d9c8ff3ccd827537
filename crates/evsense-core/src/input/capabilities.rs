// Evsense Input Layer - Capability Probing
// Raw capability masks and the classification facts derived from them

use crate::analog::{AxisFilter, FilterMode};
use crate::device::EventSource;
use crate::input::bits::BitMask;
use crate::input::event::*;

/// Result type for probing
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while probing a device
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Capability query failed: {0}")]
    Query(#[from] std::io::Error),
}

/// One absolute axis as reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsAxis {
    pub code: u16,
    /// Reported (minimum, maximum); `None` when the range query failed
    pub range: Option<(i32, i32)>,
}

impl AbsAxis {
    pub fn new(code: u16, minimum: i32, maximum: i32) -> Self {
        Self {
            code,
            range: Some((minimum, maximum)),
        }
    }

    pub fn unranged(code: u16) -> Self {
        Self { code, range: None }
    }
}

/// Raw capability masks for one device.
#[derive(Debug, Clone)]
pub struct DeviceCapabilities {
    /// Supported event types (EV_* bits)
    pub event_types: BitMask,
    /// Supported key and button codes
    pub keys: BitMask,
    /// Supported relative axes
    pub relative: BitMask,
    /// Supported absolute axes in ascending code order
    pub absolute: Vec<AbsAxis>,
}

impl DeviceCapabilities {
    /// Empty capability set
    pub fn new() -> Self {
        Self {
            event_types: BitMask::new(EV_MAX),
            keys: BitMask::new(KEY_MAX),
            relative: BitMask::new(REL_MAX),
            absolute: Vec::new(),
        }
    }

    pub fn with_keys(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.event_types.set(EV_KEY);
        for code in codes {
            self.keys.set(code);
        }
        self
    }

    pub fn with_relative(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.event_types.set(EV_REL);
        for code in codes {
            self.relative.set(code);
        }
        self
    }

    pub fn with_absolute(mut self, axes: impl IntoIterator<Item = AbsAxis>) -> Self {
        self.event_types.set(EV_ABS);
        self.absolute.extend(axes);
        self.absolute.sort_by_key(|axis| axis.code);
        self.absolute.dedup_by_key(|axis| axis.code);
        self
    }

    /// Check if a specific key code is supported
    pub fn supports_key(&self, key_code: u16) -> bool {
        self.keys.contains(key_code)
    }
}

impl Default for DeviceCapabilities {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-axis slot allocated for an absolute axis
#[derive(Debug, Clone)]
pub struct AxisSlot {
    pub code: u16,
    pub filter: AxisFilter,
}

/// Classification facts derived from a device's capability masks
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    pub button_count: usize,
    pub has_mouse_buttons: bool,
    pub has_joystick_buttons: bool,
    pub has_relative_pair: bool,
    pub axes: Vec<AxisSlot>,
}

const MOUSE_BUTTONS: &[u16] = &[BTN_MOUSE, BTN_LEFT, BTN_RIGHT, BTN_MIDDLE];
const JOYSTICK_BUTTONS: &[u16] = &[BTN_JOYSTICK, BTN_GAMEPAD, BTN_WHEEL];

/// Build the filter for one reported absolute axis.
///
/// A missing range falls back to the signed 16-bit default. An empty or
/// inverted range means the driver lied; that trips a debug assertion and
/// falls back the same way in release builds.
pub fn axis_filter(axis: &AbsAxis) -> AxisFilter {
    match axis.range {
        Some((minimum, maximum)) => {
            debug_assert!(
                maximum > minimum,
                "axis {:#x} reports range {}..{}",
                axis.code,
                minimum,
                maximum
            );
            if maximum > minimum {
                AxisFilter::with_range(FilterMode::Average, minimum, maximum)
            } else {
                AxisFilter::new(FilterMode::Average)
            }
        }
        None => AxisFilter::new(FilterMode::Average),
    }
}

/// Derive the classification facts from raw capability masks.
pub fn derive_report(caps: &DeviceCapabilities) -> ProbeReport {
    let mut report = ProbeReport::default();

    if caps.event_types.contains(EV_KEY) {
        report.button_count = caps.keys.count();
        report.has_mouse_buttons = MOUSE_BUTTONS.iter().any(|b| caps.keys.contains(*b));
        report.has_joystick_buttons = JOYSTICK_BUTTONS.iter().any(|b| caps.keys.contains(*b));
    }

    if caps.event_types.contains(EV_REL) {
        report.has_relative_pair = caps.relative.contains(REL_X) && caps.relative.contains(REL_Y);
    }

    if caps.event_types.contains(EV_ABS) {
        report.axes = caps
            .absolute
            .iter()
            .map(|axis| AxisSlot {
                code: axis.code,
                filter: axis_filter(axis),
            })
            .collect();
    }

    report
}

/// Query a device's capabilities and derive its capability report.
///
/// Failure of the capability query is the only error; the caller drops
/// the device and keeps scanning.
pub fn probe(source: &dyn EventSource) -> ProbeResult<ProbeReport> {
    let caps = source.capabilities()?;
    Ok(derive_report(&caps))
}

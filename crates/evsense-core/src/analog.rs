// Evsense Analog Filtering
// Per-axis deadzone, edge clamping and sample windowing

use serde::Deserialize;
use strum_macros::{Display, EnumString};

/// Capacity of the per-axis sample window
pub const WINDOW_CAPACITY: usize = 64;

/// Default range used when a device does not report one
pub const DEFAULT_LOWER: i32 = i16::MIN as i32;
pub const DEFAULT_UPPER: i32 = i16::MAX as i32;

/// How an axis turns raw samples into emitted samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Never emits
    Disabled,
    /// Emits every raw sample unchanged, skipping deadzone and clamping
    #[strum(serialize = "pass", serialize = "passthrough")]
    PassThrough,
    /// Emits the truncated mean of each full window
    #[strum(serialize = "average", serialize = "avg")]
    Average,
    /// Emits the newest sample of each full window
    #[strum(serialize = "last", serialize = "lastofwindow")]
    LastOfWindow,
}

/// User-facing filter configuration for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalogConfig {
    pub lower: i32,
    pub upper: i32,
    pub deadzone: i32,
    /// Window size; clamped to `1..=WINDOW_CAPACITY` when applied
    pub window: usize,
    pub mode: FilterMode,
}

impl Default for AnalogConfig {
    fn default() -> Self {
        Self {
            lower: DEFAULT_LOWER,
            upper: DEFAULT_UPPER,
            deadzone: 0,
            window: 1,
            mode: FilterMode::Average,
        }
    }
}

/// Conditioning state for a single axis.
///
/// The deadzone and edge flags give the filter hysteresis: once a zero (or
/// a clamped boundary value) has been emitted, further samples on the same
/// side are dropped until the value leaves that zone.
#[derive(Debug, Clone)]
pub struct AxisFilter {
    mode: FilterMode,
    previous_mode: FilterMode,
    lower: i32,
    upper: i32,
    deadzone: i32,
    window: [i32; WINDOW_CAPACITY],
    window_len: usize,
    offset: usize,
    in_deadzone: bool,
    in_lower: bool,
    in_upper: bool,
}

impl AxisFilter {
    /// Filter with the given mode over the default signed 16-bit range
    pub fn new(mode: FilterMode) -> Self {
        Self {
            mode,
            previous_mode: mode,
            lower: DEFAULT_LOWER,
            upper: DEFAULT_UPPER,
            deadzone: 0,
            window: [0; WINDOW_CAPACITY],
            window_len: 1,
            offset: 0,
            in_deadzone: false,
            in_lower: false,
            in_upper: false,
        }
    }

    /// Filter with the given mode over a reported range
    pub fn with_range(mode: FilterMode, lower: i32, upper: i32) -> Self {
        let mut filter = Self::new(mode);
        filter.lower = lower;
        filter.upper = upper;
        filter
    }

    pub fn from_config(config: &AnalogConfig) -> Self {
        let mut filter = Self::new(config.mode);
        filter.configure(config);
        filter
    }

    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Current window write offset
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn config(&self) -> AnalogConfig {
        AnalogConfig {
            lower: self.lower,
            upper: self.upper,
            deadzone: self.deadzone,
            window: self.window_len,
            mode: self.mode,
        }
    }

    /// Replace the configuration, resetting the window and hysteresis state
    pub fn configure(&mut self, config: &AnalogConfig) {
        self.lower = config.lower;
        self.upper = config.upper;
        self.deadzone = config.deadzone;
        self.window_len = config.window.clamp(1, WINDOW_CAPACITY);
        self.mode = config.mode;
        self.offset = 0;
        self.in_deadzone = false;
        self.in_lower = false;
        self.in_upper = false;
    }

    /// Park the axis: remember the current mode and stop emitting
    pub fn disable(&mut self) {
        if self.mode != FilterMode::Disabled {
            self.previous_mode = self.mode;
            self.mode = FilterMode::Disabled;
        }
    }

    /// Undo a previous `disable`
    pub fn restore(&mut self) {
        if self.mode == FilterMode::Disabled {
            self.mode = self.previous_mode;
        }
    }

    /// Feed one raw sample; returns the value to emit, if any.
    pub fn sample(&mut self, raw: i32) -> Option<i32> {
        let mut value = raw;

        match self.mode {
            FilterMode::Disabled => return None,
            FilterMode::PassThrough => return Some(raw),
            FilterMode::Average | FilterMode::LastOfWindow => {}
        }

        if value.unsigned_abs() < self.deadzone.unsigned_abs() {
            if self.in_deadzone {
                return None;
            }
            value = 0;
            self.in_deadzone = true;
        } else {
            self.in_deadzone = false;
        }

        if value < self.lower {
            if self.in_lower {
                return None;
            }
            value = self.lower;
            self.in_lower = true;
            self.in_upper = false;
        } else if value > self.upper {
            if self.in_upper {
                return None;
            }
            value = self.upper;
            self.in_upper = true;
            self.in_lower = false;
        } else {
            self.in_lower = false;
            self.in_upper = false;
        }

        self.window[self.offset] = value;
        self.offset += 1;
        if self.offset < self.window_len {
            return None;
        }
        self.offset = 0;

        let filled = &self.window[..self.window_len];
        let out = match self.mode {
            FilterMode::LastOfWindow => filled[filled.len() - 1],
            _ => {
                let total: i64 = filled.iter().map(|v| *v as i64).sum();
                (total / filled.len() as i64) as i32
            }
        };
        Some(out)
    }
}

impl Default for AxisFilter {
    fn default() -> Self {
        Self::new(FilterMode::Average)
    }
}

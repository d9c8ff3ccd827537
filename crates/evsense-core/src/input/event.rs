// Evsense Input Layer - Raw Kernel Reports
// Event type/code constants from linux/input-event-codes.h and the raw report shape

/// EV_SYN event type code
pub const EV_SYN: u16 = 0x00;
/// EV_KEY event type code
pub const EV_KEY: u16 = 0x01;
/// EV_REL event type code
pub const EV_REL: u16 = 0x02;
/// EV_ABS event type code
pub const EV_ABS: u16 = 0x03;
/// EV_MSC event type code
pub const EV_MSC: u16 = 0x04;
/// Highest event type code
pub const EV_MAX: u16 = 0x1f;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_MAX: u16 = 0x0f;

pub const ABS_X: u16 = 0x00;
pub const ABS_Y: u16 = 0x01;
pub const ABS_HAT0X: u16 = 0x10;
pub const ABS_HAT0Y: u16 = 0x11;
pub const ABS_HAT3Y: u16 = 0x17;

pub const BTN_MOUSE: u16 = 0x110;
pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_MIDDLE: u16 = 0x112;
pub const BTN_JOYSTICK: u16 = 0x120;
pub const BTN_GAMEPAD: u16 = 0x130;
pub const BTN_WHEEL: u16 = 0x150;
pub const KEY_MAX: u16 = 0x2ff;

/// Value carried by an EV_KEY report when the kernel autorepeats a held key
pub const KEY_VALUE_REPEAT: i32 = 2;

/// One raw report as read from an event node.
///
/// Timestamps are dropped on read; nothing downstream consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEvent {
    /// Event type (EV_KEY, EV_REL, ...)
    pub kind: u16,
    /// Event code within the type
    pub code: u16,
    /// Report value (0/1/2 for keys, delta for REL, position for ABS)
    pub value: i32,
}

impl RawEvent {
    pub fn new(kind: u16, code: u16, value: i32) -> Self {
        Self { kind, code, value }
    }

    pub fn key(code: u16, value: i32) -> Self {
        Self::new(EV_KEY, code, value)
    }

    pub fn rel(code: u16, value: i32) -> Self {
        Self::new(EV_REL, code, value)
    }

    pub fn abs(code: u16, value: i32) -> Self {
        Self::new(EV_ABS, code, value)
    }

    /// Check if this is a key report
    pub fn is_key(&self) -> bool {
        self.kind == EV_KEY
    }

    /// Check if this is an absolute hat axis report
    pub fn is_hat(&self) -> bool {
        self.kind == EV_ABS && is_hat_axis(self.code)
    }
}

/// Check if an absolute axis code belongs to one of the four hat pairs.
pub fn is_hat_axis(code: u16) -> bool {
    (ABS_HAT0X..=ABS_HAT3Y).contains(&code)
}

// Evsense Keyboard Modifiers
// Held-modifier bitmask and lock-key toggles tracked per keyboard node

use bitflags::bitflags;

use crate::key::code;

bitflags! {
    /// Currently held modifier keys, as carried on translated key events.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const LSHIFT = 1 << 0;
        const RSHIFT = 1 << 1;
        const LCTRL = 1 << 2;
        const RCTRL = 1 << 3;
        const LALT = 1 << 4;
        const RALT = 1 << 5;
        const LMETA = 1 << 6;
        const RMETA = 1 << 7;
        const CAPS = 1 << 8;

        const SHIFT = Self::LSHIFT.bits() | Self::RSHIFT.bits();
        const CTRL = Self::LCTRL.bits() | Self::RCTRL.bits();
        const ALT = Self::LALT.bits() | Self::RALT.bits();
        const META = Self::LMETA.bits() | Self::RMETA.bits();
    }
}

/// Map a key code to the modifier bit it drives, if any
pub fn modifier_for_code(key_code: u16) -> Option<Modifiers> {
    match key_code {
        code::LEFT_SHIFT => Some(Modifiers::LSHIFT),
        code::RIGHT_SHIFT => Some(Modifiers::RSHIFT),
        code::LEFT_CTRL => Some(Modifiers::LCTRL),
        code::RIGHT_CTRL => Some(Modifiers::RCTRL),
        code::LEFT_ALT => Some(Modifiers::LALT),
        code::RIGHT_ALT => Some(Modifiers::RALT),
        code::LEFT_META => Some(Modifiers::LMETA),
        code::RIGHT_META => Some(Modifiers::RMETA),
        code::CAPSLOCK => Some(Modifiers::CAPS),
        _ => None,
    }
}

impl Modifiers {
    /// Set or clear the bit for `key_code`; other keys leave the mask alone.
    pub fn update(&mut self, key_code: u16, pressed: bool) {
        if let Some(bit) = modifier_for_code(key_code) {
            self.set(bit, pressed);
        }
    }

    pub fn shift(self) -> bool {
        self.intersects(Modifiers::SHIFT)
    }
}

/// Lock-key toggles. Flipped on press, unaffected by release or repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LockState {
    pub caps_lock: bool,
    pub num_lock: bool,
    pub scroll_lock: bool,
}

impl LockState {
    pub fn toggle(&mut self, key_code: u16) {
        match key_code {
            code::CAPSLOCK => self.caps_lock = !self.caps_lock,
            code::NUMLOCK => self.num_lock = !self.num_lock,
            code::SCROLLLOCK => self.scroll_lock = !self.scroll_lock,
            _ => {}
        }
    }
}

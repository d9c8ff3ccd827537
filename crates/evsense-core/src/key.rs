// Evsense Key Translation
// Linux key codes to engine key symbols and US-layout characters

use std::fmt;
use std::sync::OnceLock;

use crate::modifier::{LockState, Modifiers};

/// Linux key codes referenced by the translation tables
pub mod code {
    pub const ESC: u16 = 1;
    pub const KEY_1: u16 = 2;
    pub const KEY_0: u16 = 11;
    pub const MINUS: u16 = 12;
    pub const EQUAL: u16 = 13;
    pub const BACKSPACE: u16 = 14;
    pub const TAB: u16 = 15;
    pub const Q: u16 = 16;
    pub const LEFT_BRACE: u16 = 26;
    pub const RIGHT_BRACE: u16 = 27;
    pub const ENTER: u16 = 28;
    pub const LEFT_CTRL: u16 = 29;
    pub const A: u16 = 30;
    pub const SEMICOLON: u16 = 39;
    pub const APOSTROPHE: u16 = 40;
    pub const GRAVE: u16 = 41;
    pub const LEFT_SHIFT: u16 = 42;
    pub const BACKSLASH: u16 = 43;
    pub const Z: u16 = 44;
    pub const COMMA: u16 = 51;
    pub const DOT: u16 = 52;
    pub const SLASH: u16 = 53;
    pub const RIGHT_SHIFT: u16 = 54;
    pub const KPASTERISK: u16 = 55;
    pub const LEFT_ALT: u16 = 56;
    pub const SPACE: u16 = 57;
    pub const CAPSLOCK: u16 = 58;
    pub const F1: u16 = 59;
    pub const F10: u16 = 68;
    pub const NUMLOCK: u16 = 69;
    pub const SCROLLLOCK: u16 = 70;
    pub const KP7: u16 = 71;
    pub const KP8: u16 = 72;
    pub const KP9: u16 = 73;
    pub const KPMINUS: u16 = 74;
    pub const KP4: u16 = 75;
    pub const KP5: u16 = 76;
    pub const KP6: u16 = 77;
    pub const KPPLUS: u16 = 78;
    pub const KP1: u16 = 79;
    pub const KP2: u16 = 80;
    pub const KP3: u16 = 81;
    pub const KP0: u16 = 82;
    pub const KPDOT: u16 = 83;
    pub const F11: u16 = 87;
    pub const F12: u16 = 88;
    pub const KPENTER: u16 = 96;
    pub const RIGHT_CTRL: u16 = 97;
    pub const KPSLASH: u16 = 98;
    pub const SYSRQ: u16 = 99;
    pub const RIGHT_ALT: u16 = 100;
    pub const HOME: u16 = 102;
    pub const UP: u16 = 103;
    pub const PAGE_UP: u16 = 104;
    pub const LEFT: u16 = 105;
    pub const RIGHT: u16 = 106;
    pub const END: u16 = 107;
    pub const DOWN: u16 = 108;
    pub const PAGE_DOWN: u16 = 109;
    pub const INSERT: u16 = 110;
    pub const DELETE: u16 = 111;
    pub const POWER: u16 = 116;
    pub const KPEQUAL: u16 = 117;
    pub const PAUSE: u16 = 119;
    pub const LEFT_META: u16 = 125;
    pub const RIGHT_META: u16 = 126;
    pub const COMPOSE: u16 = 127;
    pub const HELP: u16 = 138;
    pub const MENU: u16 = 139;
    pub const F13: u16 = 183;
    pub const F15: u16 = 185;
}

/// Engine key symbol. Numbering follows the SDL 1.2 keysym space the
/// event consumers already understand; 0 means "no symbol".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct KeySym(pub u16);

impl KeySym {
    pub const UNKNOWN: KeySym = KeySym(0);
    pub const BACKSPACE: KeySym = KeySym(8);
    pub const TAB: KeySym = KeySym(9);
    pub const RETURN: KeySym = KeySym(13);
    pub const PAUSE: KeySym = KeySym(19);
    pub const ESCAPE: KeySym = KeySym(27);
    pub const SPACE: KeySym = KeySym(32);
    pub const DELETE: KeySym = KeySym(127);
    pub const KP0: KeySym = KeySym(256);
    pub const KP_PERIOD: KeySym = KeySym(266);
    pub const KP_DIVIDE: KeySym = KeySym(267);
    pub const KP_MULTIPLY: KeySym = KeySym(268);
    pub const KP_MINUS: KeySym = KeySym(269);
    pub const KP_PLUS: KeySym = KeySym(270);
    pub const KP_ENTER: KeySym = KeySym(271);
    pub const KP_EQUALS: KeySym = KeySym(272);
    pub const UP: KeySym = KeySym(273);
    pub const DOWN: KeySym = KeySym(274);
    pub const RIGHT: KeySym = KeySym(275);
    pub const LEFT: KeySym = KeySym(276);
    pub const INSERT: KeySym = KeySym(277);
    pub const HOME: KeySym = KeySym(278);
    pub const END: KeySym = KeySym(279);
    pub const PAGEUP: KeySym = KeySym(280);
    pub const PAGEDOWN: KeySym = KeySym(281);
    pub const F1: KeySym = KeySym(282);
    pub const NUMLOCK: KeySym = KeySym(300);
    pub const CAPSLOCK: KeySym = KeySym(301);
    pub const SCROLLOCK: KeySym = KeySym(302);
    pub const RSHIFT: KeySym = KeySym(303);
    pub const LSHIFT: KeySym = KeySym(304);
    pub const RCTRL: KeySym = KeySym(305);
    pub const LCTRL: KeySym = KeySym(306);
    pub const RALT: KeySym = KeySym(307);
    pub const LALT: KeySym = KeySym(308);
    pub const RMETA: KeySym = KeySym(309);
    pub const LMETA: KeySym = KeySym(310);
    pub const COMPOSE: KeySym = KeySym(314);
    pub const HELP: KeySym = KeySym(315);
    pub const PRINT: KeySym = KeySym(316);
    pub const MENU: KeySym = KeySym(319);
    pub const POWER: KeySym = KeySym(320);

    /// Get the raw numeric symbol value
    pub fn value(self) -> u16 {
        self.0
    }
}

impl fmt::Display for KeySym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym{}", self.0)
    }
}

const TABLE_LEN: usize = 0x300;

/// QWERTY letter rows by key code, used for both tables
const LETTER_ROWS: [(u16, &[u8]); 3] = [
    (code::Q, b"qwertyuiop"),
    (code::A, b"asdfghjkl"),
    (code::Z, b"zxcvbnm"),
];

/// Printable non-letter keys: (code, unshifted, shifted)
const PUNCTUATION: &[(u16, u8, u8)] = &[
    (code::MINUS, b'-', b'_'),
    (code::EQUAL, b'=', b'+'),
    (code::LEFT_BRACE, b'[', b'{'),
    (code::RIGHT_BRACE, b']', b'}'),
    (code::SEMICOLON, b';', b':'),
    (code::APOSTROPHE, b'\'', b'"'),
    (code::GRAVE, b'`', b'~'),
    (code::BACKSLASH, b'\\', b'|'),
    (code::COMMA, b',', b'<'),
    (code::DOT, b'.', b'>'),
    (code::SLASH, b'/', b'?'),
    (code::SPACE, b' ', b' '),
];

const SHIFTED_DIGITS: &[u8; 10] = b"!@#$%^&*()";

/// Keypad digits in kernel code order mapped to their digit value
const KEYPAD_DIGITS: [(u16, u16); 10] = [
    (code::KP0, 0),
    (code::KP1, 1),
    (code::KP2, 2),
    (code::KP3, 3),
    (code::KP4, 4),
    (code::KP5, 5),
    (code::KP6, 6),
    (code::KP7, 7),
    (code::KP8, 8),
    (code::KP9, 9),
];

fn keysym_table() -> &'static [u16] {
    static KEYSYMS: OnceLock<Vec<u16>> = OnceLock::new();
    KEYSYMS.get_or_init(|| {
        let mut syms = vec![0u16; TABLE_LEN];
        let mut put = |c: u16, sym: KeySym| syms[c as usize] = sym.0;

        for (base, row) in LETTER_ROWS {
            for (i, letter) in row.iter().enumerate() {
                put(base + i as u16, KeySym(*letter as u16));
            }
        }
        // KEY_1..KEY_9 then KEY_0
        for i in 0..9u16 {
            put(code::KEY_1 + i, KeySym(b'1' as u16 + i));
        }
        put(code::KEY_0, KeySym(b'0' as u16));
        for (c, plain, _) in PUNCTUATION {
            put(*c, KeySym(*plain as u16));
        }
        for (c, digit) in KEYPAD_DIGITS {
            put(c, KeySym(KeySym::KP0.0 + digit));
        }
        for i in 0..10u16 {
            put(code::F1 + i, KeySym(KeySym::F1.0 + i));
        }
        put(code::F11, KeySym(KeySym::F1.0 + 10));
        put(code::F12, KeySym(KeySym::F1.0 + 11));
        for i in 0..3u16 {
            put(code::F13 + i, KeySym(KeySym::F1.0 + 12 + i));
        }

        put(code::ESC, KeySym::ESCAPE);
        put(code::BACKSPACE, KeySym::BACKSPACE);
        put(code::TAB, KeySym::TAB);
        put(code::ENTER, KeySym::RETURN);
        put(code::LEFT_CTRL, KeySym::LCTRL);
        put(code::RIGHT_CTRL, KeySym::RCTRL);
        put(code::LEFT_SHIFT, KeySym::LSHIFT);
        put(code::RIGHT_SHIFT, KeySym::RSHIFT);
        put(code::LEFT_ALT, KeySym::LALT);
        put(code::RIGHT_ALT, KeySym::RALT);
        put(code::LEFT_META, KeySym::LMETA);
        put(code::RIGHT_META, KeySym::RMETA);
        put(code::CAPSLOCK, KeySym::CAPSLOCK);
        put(code::NUMLOCK, KeySym::NUMLOCK);
        put(code::SCROLLLOCK, KeySym::SCROLLOCK);
        put(code::KPASTERISK, KeySym::KP_MULTIPLY);
        put(code::KPMINUS, KeySym::KP_MINUS);
        put(code::KPPLUS, KeySym::KP_PLUS);
        put(code::KPDOT, KeySym::KP_PERIOD);
        put(code::KPENTER, KeySym::KP_ENTER);
        put(code::KPSLASH, KeySym::KP_DIVIDE);
        put(code::KPEQUAL, KeySym::KP_EQUALS);
        put(code::SYSRQ, KeySym::PRINT);
        put(code::HOME, KeySym::HOME);
        put(code::UP, KeySym::UP);
        put(code::PAGE_UP, KeySym::PAGEUP);
        put(code::LEFT, KeySym::LEFT);
        put(code::RIGHT, KeySym::RIGHT);
        put(code::END, KeySym::END);
        put(code::DOWN, KeySym::DOWN);
        put(code::PAGE_DOWN, KeySym::PAGEDOWN);
        put(code::INSERT, KeySym::INSERT);
        put(code::DELETE, KeySym::DELETE);
        put(code::POWER, KeySym::POWER);
        put(code::PAUSE, KeySym::PAUSE);
        put(code::COMPOSE, KeySym::COMPOSE);
        put(code::HELP, KeySym::HELP);
        put(code::MENU, KeySym::MENU);
        syms
    })
}

/// Translate a kernel key code to an engine key symbol
pub fn keysym_for(key_code: u16) -> KeySym {
    keysym_table()
        .get(key_code as usize)
        .map(|sym| KeySym(*sym))
        .unwrap_or(KeySym::UNKNOWN)
}

/// Printable (unshifted, shifted) pair for a key code
fn printable(key_code: u16) -> Option<(u8, u8)> {
    static PRINTABLE: OnceLock<Vec<(u8, u8)>> = OnceLock::new();
    let table = PRINTABLE.get_or_init(|| {
        let mut chars = vec![(0u8, 0u8); TABLE_LEN];
        for (base, row) in LETTER_ROWS {
            for (i, letter) in row.iter().enumerate() {
                chars[(base + i as u16) as usize] = (*letter, letter.to_ascii_uppercase());
            }
        }
        for i in 0..10u16 {
            let digit = if i == 9 { b'0' } else { b'1' + i as u8 };
            chars[(code::KEY_1 + i) as usize] = (digit, SHIFTED_DIGITS[i as usize]);
        }
        for (c, plain, shifted) in PUNCTUATION {
            chars[*c as usize] = (*plain, *shifted);
        }
        chars[code::ENTER as usize] = (b'\r', b'\r');
        chars[code::TAB as usize] = (b'\t', b'\t');
        chars[code::BACKSPACE as usize] = (0x08, 0x08);
        chars[code::ESC as usize] = (0x1b, 0x1b);
        chars[code::KPASTERISK as usize] = (b'*', b'*');
        chars[code::KPMINUS as usize] = (b'-', b'-');
        chars[code::KPPLUS as usize] = (b'+', b'+');
        chars[code::KPSLASH as usize] = (b'/', b'/');
        chars[code::KPENTER as usize] = (b'\r', b'\r');
        chars
    });
    table
        .get(key_code as usize)
        .copied()
        .filter(|(plain, _)| *plain != 0)
}

/// Character sub-identifier for a key given the current modifier and lock
/// state. Returns 0 for keys that produce no character.
pub fn character_for(key_code: u16, modifiers: Modifiers, locks: LockState) -> u16 {
    if let Some((_, digit)) = KEYPAD_DIGITS.iter().find(|(c, _)| *c == key_code) {
        return if locks.num_lock { b'0' as u16 + digit } else { 0 };
    }
    if key_code == code::KPDOT {
        return if locks.num_lock { b'.' as u16 } else { 0 };
    }

    let Some((plain, shifted)) = printable(key_code) else {
        return 0;
    };
    let shift = modifiers.shift();
    let upper = if plain.is_ascii_lowercase() {
        shift ^ locks.caps_lock
    } else {
        shift
    };
    if upper {
        shifted as u16
    } else {
        plain as u16
    }
}

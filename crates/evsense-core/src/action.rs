use std::fmt;

use smallvec::{smallvec, SmallVec};

use crate::input::event::KEY_VALUE_REPEAT;

/// Represents the action state of a key report.
///
/// From `evtest` output, the "magic numbers" for assignment to enums:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    /// Returns true if the action is either PRESS or REPEAT
    pub fn is_pressed(self) -> bool {
        matches!(self, Action::Press | Action::Repeat)
    }

    /// Create Action from a raw report value.
    ///
    /// Values other than 0 and 2 count as a press, matching how the kernel
    /// treats any nonzero key value as "down".
    pub fn from_value(value: i32) -> Self {
        match value {
            0 => Action::Release,
            KEY_VALUE_REPEAT => Action::Repeat,
            _ => Action::Press,
        }
    }

    /// Edge states to emit for this action, in order.
    ///
    /// Autorepeat becomes a release followed by a press so consumers that
    /// only look at edges still see every repeat.
    pub fn edges(self) -> SmallVec<[bool; 2]> {
        match self {
            Action::Release => smallvec![false],
            Action::Press => smallvec![true],
            Action::Repeat => smallvec![false, true],
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Release => write!(f, "release"),
            Action::Press => write!(f, "press"),
            Action::Repeat => write!(f, "repeat"),
        }
    }
}

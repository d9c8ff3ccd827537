// Evsense Decoders - Digital Hats
// Pairs of absolute hat axes decoded as pole buttons

use smallvec::SmallVec;

use crate::device::HAT_SLOTS;
use crate::input::event::ABS_HAT0X;

/// Sub-identifier of the first hat pole
pub const HAT_SUBID_BASE: u16 = 64;

/// Button edges for one hat axis report, as `(subid, active)` pairs
pub type HatEdges = SmallVec<[(u16, bool); 2]>;

/// Decode one hat axis report against the per-hat pole table.
///
/// Each hat axis owns two slots: the negative pole at `2 * n` and the
/// positive pole at `2 * n + 1`. A nonzero value activates the matching
/// pole; zero releases whichever pole of this axis is still active.
pub fn decode_hat(hats: &mut [i8; HAT_SLOTS], code: u16, value: i32) -> HatEdges {
    let mut edges = HatEdges::new();
    let Some(axis) = code.checked_sub(ABS_HAT0X) else {
        return edges;
    };
    let slot = usize::from(axis) * 2;
    if slot + 1 >= HAT_SLOTS {
        return edges;
    }

    if value == 0 {
        for pole in [slot, slot + 1] {
            if hats[pole] != 0 {
                hats[pole] = 0;
                edges.push((HAT_SUBID_BASE + pole as u16, false));
            }
        }
        return edges;
    }

    let (pole, direction) = if value < 0 { (slot, -1) } else { (slot + 1, 1) };
    hats[pole] = direction;
    edges.push((HAT_SUBID_BASE + pole as u16, true));
    edges
}

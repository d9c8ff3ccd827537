// Evsense Input Layer - Device Identity
// Stable short identifiers derived from name, path and hardware ids

use std::path::Path;

use crate::device::EventSource;
use crate::input::bits::BitMask;

/// Size of the positional id space; stable ids are always at or above it
pub const MAX_DEVICES: u16 = 256;

/// Label used when a device does not report a name
pub const UNKNOWN_LABEL: &str = "unknown";

const HASH_SEED: u64 = 5381;
const ENTROPY_LEN: usize = 16;

/// Result type for identity resolution
pub type IdentifyResult<T> = Result<T, IdentifyError>;

#[derive(Debug, thiserror::Error)]
pub enum IdentifyError {
    #[error("Device at {path} reports no hardware id: {source}")]
    Unidentifiable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Vendor/product/version triple reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct HardwareId {
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
}

/// Resolved label and stable id for one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub label: String,
    pub id: u16,
}

fn fold(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, b| h.wrapping_mul(33).wrapping_add(u64::from(*b)))
}

/// Derive the 16-bit stable id for a device.
///
/// When the unique string is missing or all zero, entropy comes from the
/// label, path, hardware triple and supported event types instead.
/// Collisions between distinct devices are possible and go undetected.
pub fn stable_id(
    label: &str,
    path: &str,
    hardware: HardwareId,
    unique: Option<&[u8]>,
    event_types: &BitMask,
) -> u16 {
    let mut buf = [0u8; ENTROPY_LEN];
    let mut hash = HASH_SEED;

    let unique = unique.filter(|uniq| uniq.iter().any(|b| *b != 0));
    match unique {
        Some(uniq) => hash = fold(hash, uniq),
        None => {
            hash = fold(hash, label.as_bytes());
            hash = fold(hash, path.as_bytes());

            let [vendor_lo, vendor_hi] = hardware.vendor.to_le_bytes();
            let [product_lo, product_hi] = hardware.product.to_le_bytes();
            let [version_lo, version_hi] = hardware.version.to_le_bytes();
            buf[11] ^= vendor_hi;
            buf[10] ^= vendor_lo;
            buf[9] ^= product_hi;
            buf[8] ^= product_lo;
            buf[7] ^= version_hi;
            buf[6] ^= version_lo;

            // Sibling subdevices often share everything above but differ in
            // what they report.
            for (slot, byte) in buf.iter_mut().zip(event_types.to_le_bytes()) {
                *slot ^= byte;
            }
        }
    }

    hash = fold(hash, &buf);
    let id = hash as u16;
    if id < MAX_DEVICES {
        id + MAX_DEVICES
    } else {
        id
    }
}

/// Resolve the label and stable id of an open device.
///
/// A missing name falls back to `"unknown"`; a failed hardware id query
/// makes the device unidentifiable.
pub fn identify(source: &dyn EventSource, path: &Path) -> IdentifyResult<Identity> {
    let path_str = path.to_string_lossy();
    let label = source
        .name()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string());

    let hardware = source
        .hardware_id()
        .map_err(|source| IdentifyError::Unidentifiable {
            path: path_str.to_string(),
            source,
        })?;

    let unique = source.unique_id();
    let event_types = source
        .event_types()
        .unwrap_or_else(|_| BitMask::new(crate::input::event::EV_MAX));

    let id = stable_id(&label, &path_str, hardware, unique.as_deref(), &event_types);
    Ok(Identity { label, id })
}

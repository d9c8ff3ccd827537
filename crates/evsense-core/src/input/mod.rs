// Evsense Input Layer
// Capability probing, identity, overrides and classification of raw nodes

pub mod bits;
pub mod capabilities;
pub mod classify;
pub mod event;
pub mod identity;
pub mod overrides;

pub use capabilities::{probe, AbsAxis, DeviceCapabilities, ProbeError, ProbeReport};
pub use classify::{classify, Classification};
pub use identity::{identify, HardwareId, Identity, IdentifyError};
pub use overrides::{DeviceOverride, OverrideError, OverrideTable};

// Evsense Test Doubles
// In-memory event sources shared by unit tests

use std::collections::VecDeque;
use std::io;
use std::os::unix::io::RawFd;

use crate::device::{EventSource, KeyRepeat};
use crate::input::bits::BitMask;
use crate::input::capabilities::DeviceCapabilities;
use crate::input::event::{RawEvent, EV_MAX};
use crate::input::identity::HardwareId;

/// Size the kernel reports per input event on 64-bit targets
pub const REPORT_BYTES: usize = 24;

/// Source with a fixed descriptor that never has anything to read
pub struct NullSource {
    fd: RawFd,
}

impl NullSource {
    pub fn new(fd: RawFd) -> Self {
        Self { fd }
    }
}

impl EventSource for NullSource {
    fn raw_fd(&self) -> RawFd {
        self.fd
    }

    fn name(&self) -> Option<String> {
        None
    }

    fn hardware_id(&self) -> io::Result<HardwareId> {
        Ok(HardwareId::default())
    }

    fn unique_id(&self) -> Option<Vec<u8>> {
        None
    }

    fn event_types(&self) -> io::Result<BitMask> {
        Ok(BitMask::new(EV_MAX))
    }

    fn capabilities(&self) -> io::Result<DeviceCapabilities> {
        Ok(DeviceCapabilities::new())
    }

    fn read_events(&mut self, _out: &mut Vec<RawEvent>) -> io::Result<usize> {
        Err(io::ErrorKind::WouldBlock.into())
    }

    fn set_grab(&mut self, _grab: bool) -> io::Result<()> {
        Ok(())
    }

    fn set_repeat(&mut self, _repeat: KeyRepeat) -> io::Result<()> {
        Ok(())
    }
}

/// One scripted read outcome
pub enum Read {
    Reports(Vec<RawEvent>),
    Gone,
    Fail(io::ErrorKind),
}

/// Source that answers identity queries from fields and replays reads
pub struct ScriptedSource {
    pub fd: RawFd,
    pub name: Option<String>,
    pub hardware: Option<HardwareId>,
    pub caps: DeviceCapabilities,
    pub reads: VecDeque<Read>,
}

impl ScriptedSource {
    pub fn new(fd: RawFd, name: &str, caps: DeviceCapabilities) -> Self {
        Self {
            fd,
            name: Some(name.to_string()),
            hardware: Some(HardwareId {
                vendor: 0x1234,
                product: 0x5678,
                version: 1,
            }),
            caps,
            reads: VecDeque::new(),
        }
    }
}

impl EventSource for ScriptedSource {
    fn raw_fd(&self) -> RawFd {
        self.fd
    }

    fn name(&self) -> Option<String> {
        self.name.clone()
    }

    fn hardware_id(&self) -> io::Result<HardwareId> {
        self.hardware
            .ok_or_else(|| io::Error::new(io::ErrorKind::Unsupported, "no EVIOCGID"))
    }

    fn unique_id(&self) -> Option<Vec<u8>> {
        None
    }

    fn event_types(&self) -> io::Result<BitMask> {
        Ok(self.caps.event_types.clone())
    }

    fn capabilities(&self) -> io::Result<DeviceCapabilities> {
        Ok(self.caps.clone())
    }

    fn read_events(&mut self, out: &mut Vec<RawEvent>) -> io::Result<usize> {
        match self.reads.pop_front() {
            Some(Read::Reports(reports)) => {
                let bytes = reports.len() * REPORT_BYTES;
                out.extend(reports);
                Ok(bytes)
            }
            Some(Read::Gone) => Ok(0),
            Some(Read::Fail(kind)) => Err(kind.into()),
            None => Err(io::ErrorKind::WouldBlock.into()),
        }
    }

    fn set_grab(&mut self, _grab: bool) -> io::Result<()> {
        Ok(())
    }

    fn set_repeat(&mut self, _repeat: KeyRepeat) -> io::Result<()> {
        Ok(())
    }
}

// Evsense Device Layer - Kernel Event Sources
// evdev-backed implementation of the event source seam

use std::fs;
use std::io;
use std::mem;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;

use ::evdev::{AutoRepeat, Device};

use crate::device::{DeviceOpener, EventSource, KeyRepeat};
use crate::input::bits::BitMask;
use crate::input::capabilities::{AbsAxis, DeviceCapabilities};
use crate::input::event::{RawEvent, EV_MAX};
use crate::input::identity::HardwareId;

/// Reports read per batch
const READ_BATCH: usize = 64;

/// An opened `/dev/input/event*` node
pub struct EvdevSource {
    device: Device,
}

impl EvdevSource {
    /// Open a node in non-blocking mode
    pub fn open(path: &Path) -> io::Result<Self> {
        let device = Device::open(path)?;
        set_nonblocking(device.as_raw_fd())?;
        Ok(Self { device })
    }
}

fn set_nonblocking(fd: RawFd) -> io::Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) } < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

impl EventSource for EvdevSource {
    fn raw_fd(&self) -> RawFd {
        self.device.as_raw_fd()
    }

    fn name(&self) -> Option<String> {
        self.device.name().map(str::to_string)
    }

    fn hardware_id(&self) -> io::Result<HardwareId> {
        let id = self.device.input_id();
        Ok(HardwareId {
            vendor: id.vendor(),
            product: id.product(),
            version: id.version(),
        })
    }

    fn unique_id(&self) -> Option<Vec<u8>> {
        self.device.unique_name().map(|uniq| uniq.as_bytes().to_vec())
    }

    fn event_types(&self) -> io::Result<BitMask> {
        Ok(BitMask::from_codes(
            EV_MAX,
            self.device.supported_events().iter().map(|ty| ty.0),
        ))
    }

    fn capabilities(&self) -> io::Result<DeviceCapabilities> {
        let mut caps = DeviceCapabilities::new();
        caps.event_types = self.event_types()?;

        if let Some(keys) = self.device.supported_keys() {
            caps = caps.with_keys(keys.iter().map(|key| key.code()));
        }
        if let Some(axes) = self.device.supported_relative_axes() {
            caps = caps.with_relative(axes.iter().map(|axis| axis.0));
        }
        if let Some(axes) = self.device.supported_absolute_axes() {
            let ranges = self.device.get_abs_state().ok();
            let absolute: Vec<AbsAxis> = axes
                .iter()
                .map(|axis| {
                    let code = axis.0;
                    match ranges.as_ref().and_then(|info| info.get(code as usize)) {
                        Some(info) => AbsAxis::new(code, info.minimum, info.maximum),
                        None => AbsAxis::unranged(code),
                    }
                })
                .collect();
            caps = caps.with_absolute(absolute);
        }

        Ok(caps)
    }

    fn read_events(&mut self, out: &mut Vec<RawEvent>) -> io::Result<usize> {
        let mut buf: [libc::input_event; READ_BATCH] = unsafe { mem::zeroed() };
        let size = mem::size_of_val(&buf);
        let read = unsafe { libc::read(self.raw_fd(), buf.as_mut_ptr().cast(), size) };
        if read < 0 {
            return Err(io::Error::last_os_error());
        }

        let read = read as usize;
        let count = read / mem::size_of::<libc::input_event>();
        out.extend(
            buf[..count]
                .iter()
                .map(|ev| RawEvent::new(ev.type_, ev.code, ev.value)),
        );
        Ok(read)
    }

    fn set_grab(&mut self, grab: bool) -> io::Result<()> {
        if grab {
            self.device.grab()
        } else {
            self.device.ungrab()
        }
    }

    fn set_repeat(&mut self, repeat: KeyRepeat) -> io::Result<()> {
        self.device.update_auto_repeat(&auto_repeat(repeat))
    }
}

/// Negative timings clamp to zero
fn auto_repeat(repeat: KeyRepeat) -> AutoRepeat {
    AutoRepeat {
        delay: repeat.delay.max(0) as u32,
        period: repeat.period.max(0) as u32,
    }
}

/// Opens scan-directory entries as evdev nodes
#[derive(Debug, Default)]
pub struct EvdevOpener;

impl DeviceOpener for EvdevOpener {
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn EventSource>> {
        let file_type = fs::metadata(path)?.file_type();
        if !file_type.is_char_device() && !file_type.is_block_device() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a device node", path.display()),
            ));
        }
        Ok(Box::new(EvdevSource::open(path)?))
    }
}

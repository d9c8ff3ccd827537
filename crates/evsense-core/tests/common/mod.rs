// Evsense Integration Test Doubles
//
// Socket-pair backed event sources so the real poll loop sees readiness,
// plus an in-memory opener, directory watch and console.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::rc::Rc;

use evsense_core::console::{Console, ConsoleResult, KD_TEXT, K_UNICODE};
use evsense_core::device::{DeviceOpener, EventSource, KeyRepeat};
use evsense_core::hotplug::DirectoryWatch;
use evsense_core::input::bits::BitMask;
use evsense_core::input::capabilities::{AbsAxis, DeviceCapabilities};
use evsense_core::input::event::*;
use evsense_core::input::identity::HardwareId;

/// Test-side handle to a plugged device
pub struct Plug {
    writer: Option<UnixStream>,
    pending: Rc<RefCell<VecDeque<Vec<RawEvent>>>>,
    pub grabbed: Rc<Cell<bool>>,
    pub repeat: Rc<Cell<Option<KeyRepeat>>>,
}

impl Plug {
    /// Queue one batch of reports and make the device readable
    pub fn send(&mut self, reports: Vec<RawEvent>) {
        self.pending.borrow_mut().push_back(reports);
        if let Some(writer) = self.writer.as_mut() {
            writer.write_all(&[1]).unwrap();
        }
    }

    /// Close the device end; the next read reports end of file
    pub fn unplug(&mut self) {
        self.writer = None;
    }
}

pub struct PipeSource {
    reader: UnixStream,
    name: String,
    caps: DeviceCapabilities,
    pending: Rc<RefCell<VecDeque<Vec<RawEvent>>>>,
    grabbed: Rc<Cell<bool>>,
    repeat: Rc<Cell<Option<KeyRepeat>>>,
}

pub fn pipe_source(name: &str, caps: DeviceCapabilities) -> (PipeSource, Plug) {
    let (reader, writer) = UnixStream::pair().unwrap();
    reader.set_nonblocking(true).unwrap();
    let pending = Rc::new(RefCell::new(VecDeque::new()));
    let grabbed = Rc::new(Cell::new(false));
    let repeat = Rc::new(Cell::new(None));
    let source = PipeSource {
        reader,
        name: name.to_string(),
        caps,
        pending: Rc::clone(&pending),
        grabbed: Rc::clone(&grabbed),
        repeat: Rc::clone(&repeat),
    };
    let plug = Plug {
        writer: Some(writer),
        pending,
        grabbed,
        repeat,
    };
    (source, plug)
}

impl EventSource for PipeSource {
    fn raw_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    fn name(&self) -> Option<String> {
        Some(self.name.clone())
    }

    fn hardware_id(&self) -> io::Result<HardwareId> {
        Ok(HardwareId {
            vendor: 0x046d,
            product: 0xc52b,
            version: 0x0111,
        })
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
        let mut buf = [0u8; 64];
        let n = self.reader.read(&mut buf)?;
        if n == 0 {
            return Ok(0);
        }
        for _ in 0..n {
            if let Some(batch) = self.pending.borrow_mut().pop_front() {
                out.extend(batch);
            }
        }
        Ok(n)
    }

    fn set_grab(&mut self, grab: bool) -> io::Result<()> {
        self.grabbed.set(grab);
        Ok(())
    }

    fn set_repeat(&mut self, repeat: KeyRepeat) -> io::Result<()> {
        self.repeat.set(Some(repeat));
        Ok(())
    }
}

/// Opener that hands out prepared sources by file name
#[derive(Clone, Default)]
pub struct MockOpener {
    sources: Rc<RefCell<HashMap<OsString, PipeSource>>>,
}

impl MockOpener {
    pub fn add(&self, file_name: &str, source: PipeSource) {
        self.sources
            .borrow_mut()
            .insert(OsString::from(file_name), source);
    }
}

impl DeviceOpener for MockOpener {
    fn open(&mut self, path: &Path) -> io::Result<Box<dyn EventSource>> {
        let name = path.file_name().unwrap_or_default();
        match self.sources.borrow_mut().remove(name) {
            Some(source) => Ok(Box::new(source)),
            None => Err(io::Error::new(io::ErrorKind::PermissionDenied, "not a device")),
        }
    }
}

/// Directory watch fed by the test
pub struct MockWatch {
    reader: UnixStream,
    names: Rc<RefCell<Vec<OsString>>>,
}

pub struct Announcer {
    writer: UnixStream,
    names: Rc<RefCell<Vec<OsString>>>,
}

impl Announcer {
    pub fn created(&mut self, name: &str) {
        self.names.borrow_mut().push(OsString::from(name));
        self.writer.write_all(&[1]).unwrap();
    }
}

pub fn mock_watch() -> (MockWatch, Announcer) {
    let (reader, writer) = UnixStream::pair().unwrap();
    reader.set_nonblocking(true).unwrap();
    let names = Rc::new(RefCell::new(Vec::new()));
    (
        MockWatch {
            reader,
            names: Rc::clone(&names),
        },
        Announcer { writer, names },
    )
}

impl DirectoryWatch for MockWatch {
    fn raw_fd(&self) -> RawFd {
        self.reader.as_raw_fd()
    }

    fn drain(&mut self) -> io::Result<Vec<OsString>> {
        let mut buf = [0u8; 64];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        Ok(self.names.borrow_mut().drain(..).collect())
    }
}

/// Terminal state observed through the console double
#[derive(Debug)]
pub struct Terminal {
    pub display: i32,
    pub keyboard: i32,
    pub leds: u8,
    pub muted: bool,
    pub calls: Vec<&'static str>,
}

impl Default for Terminal {
    fn default() -> Self {
        Self {
            display: KD_TEXT,
            keyboard: K_UNICODE,
            leds: 0b100,
            muted: false,
            calls: Vec::new(),
        }
    }
}

pub struct MockConsole {
    state: Rc<RefCell<Terminal>>,
}

pub fn mock_console() -> (MockConsole, Rc<RefCell<Terminal>>) {
    let state = Rc::new(RefCell::new(Terminal::default()));
    (
        MockConsole {
            state: Rc::clone(&state),
        },
        state,
    )
}

impl Console for MockConsole {
    fn is_terminal(&self) -> bool {
        true
    }

    fn display_mode(&self) -> ConsoleResult<i32> {
        Ok(self.state.borrow().display)
    }

    fn set_display_mode(&mut self, mode: i32) -> ConsoleResult<()> {
        let mut tty = self.state.borrow_mut();
        tty.display = mode;
        tty.calls.push("display");
        Ok(())
    }

    fn leds(&self) -> ConsoleResult<u8> {
        Ok(self.state.borrow().leds)
    }

    fn set_leds(&mut self, leds: u8) -> ConsoleResult<()> {
        let mut tty = self.state.borrow_mut();
        tty.leds = leds;
        tty.calls.push("leds");
        Ok(())
    }

    fn keyboard_mode(&self) -> ConsoleResult<i32> {
        Ok(self.state.borrow().keyboard)
    }

    fn set_keyboard_mode(&mut self, mode: i32) -> ConsoleResult<()> {
        let mut tty = self.state.borrow_mut();
        tty.keyboard = mode;
        tty.calls.push("keyboard");
        Ok(())
    }

    fn set_mute(&mut self, mute: bool) -> ConsoleResult<()> {
        let mut tty = self.state.borrow_mut();
        tty.muted = mute;
        tty.calls.push("mute");
        Ok(())
    }
}

pub fn keyboard_caps() -> DeviceCapabilities {
    DeviceCapabilities::new().with_keys(1..=120)
}

pub fn mouse_caps() -> DeviceCapabilities {
    DeviceCapabilities::new()
        .with_keys([BTN_LEFT, BTN_RIGHT, BTN_MIDDLE])
        .with_relative([REL_X, REL_Y])
}

pub fn pad_caps() -> DeviceCapabilities {
    DeviceCapabilities::new()
        .with_keys([BTN_GAMEPAD, BTN_GAMEPAD + 1, BTN_GAMEPAD + 2, BTN_GAMEPAD + 3])
        .with_absolute([
            AbsAxis::new(ABS_X, -32768, 32767),
            AbsAxis::new(ABS_Y, -32768, 32767),
            AbsAxis::new(ABS_HAT0X, -1, 1),
            AbsAxis::new(ABS_HAT0Y, -1, 1),
        ])
}

// Evsense TTY Session
// Keyboard mute and graphics mode on the controlling terminal, restored on teardown

use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};

/// Status file naming the active virtual console
pub const ACTIVE_CONSOLE_FILE: &str = "/sys/class/tty/tty0/active";

/// Display modes (KDSETMODE)
pub const KD_TEXT: i32 = 0;
pub const KD_GRAPHICS: i32 = 1;

/// Keyboard translation modes (KDSKBMODE)
pub const K_RAW: i32 = 0;
pub const K_XLATE: i32 = 1;
pub const K_MEDIUMRAW: i32 = 2;
pub const K_UNICODE: i32 = 3;
pub const K_OFF: i32 = 4;

const KDSETLED: libc::c_ulong = 0x4B32;
const KDGETLED: libc::c_ulong = 0x4B31;
const KDGETMODE: libc::c_ulong = 0x4B3B;
const KDSETMODE: libc::c_ulong = 0x4B3A;
const KDGKBMODE: libc::c_ulong = 0x4B44;
const KDSKBMODE: libc::c_ulong = 0x4B45;
const KDSKBMUTE: libc::c_ulong = 0x4B51;

/// Result type for console operations
pub type ConsoleResult<T> = Result<T, ConsoleError>;

#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    #[error("Could not open terminal {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Terminal request {request} failed: {source}")]
    Ioctl {
        request: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Terminal mode switches the session needs.
///
/// The real implementation issues console ioctls; tests substitute an
/// in-memory double.
pub trait Console {
    fn is_terminal(&self) -> bool;
    fn display_mode(&self) -> ConsoleResult<i32>;
    fn set_display_mode(&mut self, mode: i32) -> ConsoleResult<()>;
    fn leds(&self) -> ConsoleResult<u8>;
    fn set_leds(&mut self, leds: u8) -> ConsoleResult<()>;
    fn keyboard_mode(&self) -> ConsoleResult<i32>;
    fn set_keyboard_mode(&mut self, mode: i32) -> ConsoleResult<()>;
    fn set_mute(&mut self, mute: bool) -> ConsoleResult<()>;
}

enum Handle {
    Owned(File),
    Stdin,
}

/// A virtual console reached through a file descriptor.
///
/// Standard input is borrowed, never closed; opened terminals close when
/// the console drops.
pub struct VtConsole {
    handle: Handle,
    path: Option<PathBuf>,
}

impl VtConsole {
    pub fn open(path: &Path) -> ConsoleResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ConsoleError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            handle: Handle::Owned(file),
            path: Some(path.to_path_buf()),
        })
    }

    pub fn stdin() -> Self {
        Self {
            handle: Handle::Stdin,
            path: None,
        }
    }

    /// Resolve the controlling terminal: explicit override, then the
    /// active console, then standard input.
    pub fn find(override_path: Option<&Path>) -> Self {
        if let Some(path) = override_path {
            match Self::open(path) {
                Ok(console) if console.is_terminal() => return console,
                Ok(_) => log::warn!("Terminal override {} is not a tty", path.display()),
                Err(e) => log::warn!("{}", e),
            }
        }

        if let Some(path) = fs::read_to_string(ACTIVE_CONSOLE_FILE)
            .ok()
            .and_then(|contents| active_console_path(&contents))
        {
            match Self::open(&path) {
                Ok(console) => return console,
                Err(e) => log::debug!("{}", e),
            }
        }

        Self::stdin()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn fd(&self) -> RawFd {
        match &self.handle {
            Handle::Owned(file) => file.as_raw_fd(),
            Handle::Stdin => libc::STDIN_FILENO,
        }
    }

    fn get(&self, request: libc::c_ulong, name: &'static str) -> ConsoleResult<libc::c_long> {
        let mut value: libc::c_long = 0;
        let rc = unsafe { libc::ioctl(self.fd(), request as _, &mut value as *mut libc::c_long) };
        if rc < 0 {
            return Err(ConsoleError::Ioctl {
                request: name,
                source: io::Error::last_os_error(),
            });
        }
        Ok(value)
    }

    fn set(&self, request: libc::c_ulong, name: &'static str, value: libc::c_ulong) -> ConsoleResult<()> {
        let rc = unsafe { libc::ioctl(self.fd(), request as _, value) };
        if rc < 0 {
            return Err(ConsoleError::Ioctl {
                request: name,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

impl Console for VtConsole {
    fn is_terminal(&self) -> bool {
        unsafe { libc::isatty(self.fd()) == 1 }
    }

    fn display_mode(&self) -> ConsoleResult<i32> {
        self.get(KDGETMODE, "KDGETMODE").map(|v| v as i32)
    }

    fn set_display_mode(&mut self, mode: i32) -> ConsoleResult<()> {
        self.set(KDSETMODE, "KDSETMODE", mode as libc::c_ulong)
    }

    fn leds(&self) -> ConsoleResult<u8> {
        self.get(KDGETLED, "KDGETLED").map(|v| v as u8)
    }

    fn set_leds(&mut self, leds: u8) -> ConsoleResult<()> {
        self.set(KDSETLED, "KDSETLED", libc::c_ulong::from(leds))
    }

    fn keyboard_mode(&self) -> ConsoleResult<i32> {
        self.get(KDGKBMODE, "KDGKBMODE").map(|v| v as i32)
    }

    fn set_keyboard_mode(&mut self, mode: i32) -> ConsoleResult<()> {
        self.set(KDSKBMODE, "KDSKBMODE", mode as libc::c_ulong)
    }

    fn set_mute(&mut self, mute: bool) -> ConsoleResult<()> {
        self.set(KDSKBMUTE, "KDSKBMUTE", libc::c_ulong::from(mute))
    }
}

/// Device path named by the active-console status file contents
pub fn active_console_path(contents: &str) -> Option<PathBuf> {
    let name = contents.lines().next()?.trim();
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(Path::new("/dev").join(name))
}

/// Terminal state captured at session start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SavedState {
    pub display_mode: Option<i32>,
    pub leds: Option<u8>,
    pub keyboard_mode: Option<i32>,
}

/// Ownership of the terminal's keyboard and display modes for the
/// lifetime of the input subsystem.
///
/// Only changes that actually took effect are undone, in reverse order.
/// Restoring is idempotent and also runs on drop.
pub struct TtySession {
    console: Box<dyn Console>,
    saved: SavedState,
    leds_cleared: bool,
    muted: bool,
    keyboard_off: bool,
    graphics: bool,
    active: bool,
}

impl TtySession {
    /// Take over the terminal. `mute` selects whether keyboard input is
    /// silenced and the display switched to graphics mode.
    pub fn start(console: Box<dyn Console>, mute: bool) -> Self {
        let mut session = Self {
            console,
            saved: SavedState::default(),
            leds_cleared: false,
            muted: false,
            keyboard_off: false,
            graphics: false,
            active: false,
        };
        if !session.console.is_terminal() {
            log::debug!("Input terminal is not a tty, leaving it alone");
            return session;
        }
        session.active = true;

        session.saved.display_mode = log_failure(session.console.display_mode());
        session.saved.leds = log_failure(session.console.leds());
        session.saved.keyboard_mode = log_failure(session.console.keyboard_mode());
        session.leds_cleared = log_failure(session.console.set_leds(0)).is_some();

        if mute {
            session.muted = log_failure(session.console.set_mute(true)).is_some();
            session.keyboard_off = log_failure(session.console.set_keyboard_mode(K_OFF)).is_some();
            session.graphics = log_failure(session.console.set_display_mode(KD_GRAPHICS)).is_some();
        }
        session
    }

    /// Whether terminal keyboard input is currently muted. Process-level
    /// interrupt handling should be ignored while this holds.
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Undo every change made at start, in reverse order
    pub fn restore(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;

        if self.graphics {
            let mode = self.saved.display_mode.unwrap_or(KD_TEXT);
            log_failure(self.console.set_display_mode(mode));
            self.graphics = false;
        }
        if self.keyboard_off {
            let mode = match self.saved.keyboard_mode {
                Some(K_OFF) | None => K_XLATE,
                Some(mode) => mode,
            };
            log_failure(self.console.set_keyboard_mode(mode));
            self.keyboard_off = false;
        }
        if self.muted {
            log_failure(self.console.set_mute(false));
            self.muted = false;
        }
        if self.leds_cleared {
            if let Some(leds) = self.saved.leds {
                log_failure(self.console.set_leds(leds));
            }
            self.leds_cleared = false;
        }
    }
}

impl Drop for TtySession {
    fn drop(&mut self) {
        self.restore();
    }
}

fn log_failure<T>(result: ConsoleResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Vt {
        display: i32,
        leds: u8,
        keyboard: i32,
        muted: bool,
        log: Vec<&'static str>,
        fail_keyboard_set: bool,
    }

    struct FakeConsole {
        tty: bool,
        state: Rc<RefCell<Vt>>,
    }

    impl Console for FakeConsole {
        fn is_terminal(&self) -> bool {
            self.tty
        }
        fn display_mode(&self) -> ConsoleResult<i32> {
            Ok(self.state.borrow().display)
        }
        fn set_display_mode(&mut self, mode: i32) -> ConsoleResult<()> {
            let mut vt = self.state.borrow_mut();
            vt.display = mode;
            vt.log.push("display");
            Ok(())
        }
        fn leds(&self) -> ConsoleResult<u8> {
            Ok(self.state.borrow().leds)
        }
        fn set_leds(&mut self, leds: u8) -> ConsoleResult<()> {
            let mut vt = self.state.borrow_mut();
            vt.leds = leds;
            vt.log.push("leds");
            Ok(())
        }
        fn keyboard_mode(&self) -> ConsoleResult<i32> {
            Ok(self.state.borrow().keyboard)
        }
        fn set_keyboard_mode(&mut self, mode: i32) -> ConsoleResult<()> {
            let mut vt = self.state.borrow_mut();
            if vt.fail_keyboard_set {
                return Err(ConsoleError::Ioctl {
                    request: "KDSKBMODE",
                    source: io::Error::from(io::ErrorKind::PermissionDenied),
                });
            }
            vt.keyboard = mode;
            vt.log.push("keyboard");
            Ok(())
        }
        fn set_mute(&mut self, mute: bool) -> ConsoleResult<()> {
            let mut vt = self.state.borrow_mut();
            vt.muted = mute;
            vt.log.push("mute");
            Ok(())
        }
    }

    fn console(vt: Vt) -> (Box<dyn Console>, Rc<RefCell<Vt>>) {
        let state = Rc::new(RefCell::new(vt));
        let console = FakeConsole {
            tty: true,
            state: Rc::clone(&state),
        };
        (Box::new(console), state)
    }

    fn text_vt() -> Vt {
        Vt {
            display: KD_TEXT,
            leds: 0b010,
            keyboard: K_UNICODE,
            ..Vt::default()
        }
    }

    #[test]
    fn test_start_mutes_and_restore_reverses() {
        let (console, state) = console(text_vt());
        let mut session = TtySession::start(console, true);
        {
            let vt = state.borrow();
            assert!(vt.muted);
            assert_eq!(vt.keyboard, K_OFF);
            assert_eq!(vt.display, KD_GRAPHICS);
            assert_eq!(vt.leds, 0);
        }
        assert!(session.is_muted());

        state.borrow_mut().log.clear();
        session.restore();
        let vt = state.borrow();
        assert_eq!(vt.log, vec!["display", "keyboard", "mute", "leds"]);
        assert_eq!((vt.display, vt.keyboard, vt.leds), (KD_TEXT, K_UNICODE, 0b010));
        assert!(!vt.muted);
        assert!(!session.is_muted());
    }

    #[test]
    fn test_saved_off_mode_restores_xlate() {
        let (console, state) = console(Vt {
            keyboard: K_OFF,
            ..text_vt()
        });
        drop(TtySession::start(console, true));
        assert_eq!(state.borrow().keyboard, K_XLATE);
    }

    #[test]
    fn test_no_mute_only_touches_leds() {
        let (console, state) = console(text_vt());
        let session = TtySession::start(console, false);
        assert!(!session.is_muted());
        assert_eq!(state.borrow().keyboard, K_UNICODE);
        drop(session);
        assert_eq!(state.borrow().leds, 0b010);
        assert_eq!(state.borrow().log, vec!["leds", "leds"]);
    }

    #[test]
    fn test_partial_start_still_restores() {
        let (console, state) = console(Vt {
            fail_keyboard_set: true,
            ..text_vt()
        });
        let mut session = TtySession::start(console, true);
        assert!(session.is_muted());
        assert_eq!(state.borrow().display, KD_GRAPHICS);

        session.restore();
        session.restore();
        let vt = state.borrow();
        assert_eq!(vt.display, KD_TEXT);
        assert!(!vt.muted);
        assert_eq!(vt.leds, 0b010);
        assert_eq!(vt.keyboard, K_UNICODE);
    }

    #[test]
    fn test_non_terminal_untouched() {
        let state = Rc::new(RefCell::new(text_vt()));
        let console = FakeConsole {
            tty: false,
            state: Rc::clone(&state),
        };
        let session = TtySession::start(Box::new(console), true);
        assert!(!session.is_muted());
        drop(session);
        assert!(state.borrow().log.is_empty());
    }

    #[test]
    fn test_active_console_path() {
        assert_eq!(active_console_path("tty2\n"), Some(PathBuf::from("/dev/tty2")));
        assert_eq!(active_console_path("\n"), None);
        assert_eq!(active_console_path("../etc/passwd"), None);
    }
}

// Evsense Hot-plug Scanner
// Initial directory enumeration plus creation notifications on the scan dir

use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::io::RawFd;
use std::path::{Path, PathBuf};

/// Default directory scanned for input nodes
pub const DEFAULT_SCAN_DIR: &str = "/dev/input";

/// Non-directory entries of the scan directory in name order
pub fn scan_entries(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect();
    entries.sort();
    Ok(entries)
}

/// Creation notifications for one directory.
///
/// The descriptor is polled together with the device descriptors; `drain`
/// is only called once it reports readable.
pub trait DirectoryWatch {
    fn raw_fd(&self) -> RawFd;

    /// Names of non-directory entries created since the last drain
    fn drain(&mut self) -> io::Result<Vec<OsString>>;
}

#[cfg(feature = "pure-rust")]
pub use self::notify::InotifyWatch;

#[cfg(feature = "pure-rust")]
mod notify {
    use std::ffi::OsString;
    use std::io;
    use std::os::unix::io::{AsRawFd, RawFd};
    use std::path::Path;

    use inotify::{EventMask, Inotify, WatchMask};

    use super::DirectoryWatch;

    const NOTIFY_BUFFER: usize = 1024;

    /// inotify watch for `IN_CREATE` on the scan directory
    pub struct InotifyWatch {
        inotify: Inotify,
        buffer: [u8; NOTIFY_BUFFER],
    }

    impl InotifyWatch {
        pub fn new(dir: &Path) -> io::Result<Self> {
            let inotify = Inotify::init()?;
            inotify.watches().add(dir, WatchMask::CREATE)?;
            Ok(Self {
                inotify,
                buffer: [0; NOTIFY_BUFFER],
            })
        }
    }

    impl DirectoryWatch for InotifyWatch {
        fn raw_fd(&self) -> RawFd {
            self.inotify.as_raw_fd()
        }

        fn drain(&mut self) -> io::Result<Vec<OsString>> {
            let events = match self.inotify.read_events(&mut self.buffer) {
                Ok(events) => events,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(Vec::new()),
                Err(e) => return Err(e),
            };
            Ok(events
                .filter(|ev| ev.mask.contains(EventMask::CREATE) && !ev.mask.contains(EventMask::ISDIR))
                .filter_map(|ev| ev.name.map(|name| name.to_os_string()))
                .collect())
        }
    }
}

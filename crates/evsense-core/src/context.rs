// Evsense Input Context
// Session state, discovery and the zero-timeout poll loop

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::analog::AnalogConfig;
use crate::console::{Console, TtySession};
use crate::decode;
use crate::device::{Decoder, DeviceKind, DeviceOpener, EventSource, KeyRepeat};
use crate::event::{EventSink, InputCapabilities};
use crate::hotplug::{scan_entries, DirectoryWatch};
use crate::input::capabilities::probe;
use crate::input::classify::classify;
use crate::input::event::RawEvent;
use crate::input::identity::{identify, MAX_DEVICES};
use crate::input::overrides::OverrideTable;
use crate::registry::{Placement, Registry, RegistryError};
use crate::settings::InputSettings;

/// Result type for session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Failures that escape the context. Everything else is logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Poll failed: {0}")]
    Poll(#[source] io::Error),
}

/// Errors from per-device queries and commands
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("No such device: {0}")]
    NoSuchDevice(i32),

    #[error("Device {device} has no axis {axis}")]
    BadAxis { device: i32, axis: usize },

    #[error("Could not change grab on device {device}: {source}")]
    Grab {
        device: i32,
        #[source]
        source: io::Error,
    },
}

/// Device information for listing devices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Registry slot (positional id)
    pub slot: usize,
    /// Stable id
    pub id: u16,
    pub label: String,
    pub path: String,
    pub kind: DeviceKind,
    pub decoder: Decoder,
}

/// The input subsystem for one session.
///
/// Owns every device source, the hot-plug watch and the terminal session.
/// Single-threaded: all work happens inside `process` and the query calls.
pub struct InputContext {
    settings: InputSettings,
    registry: Registry,
    opener: Box<dyn DeviceOpener>,
    overrides: OverrideTable,
    watch: Option<Box<dyn DirectoryWatch>>,
    tty: Option<TtySession>,
    repeat: KeyRepeat,
    mouse_id: Option<u16>,
    scanned: bool,
    reports: Vec<RawEvent>,
    pollset: Vec<libc::pollfd>,
}

impl InputContext {
    /// Context with no terminal and no hot-plug watch
    pub fn new(settings: InputSettings, opener: Box<dyn DeviceOpener>) -> Self {
        Self {
            settings,
            registry: Registry::new(),
            opener,
            overrides: OverrideTable::new(),
            watch: None,
            tty: None,
            repeat: KeyRepeat::default(),
            mouse_id: None,
            scanned: false,
            reports: Vec::with_capacity(64),
            pollset: Vec::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: OverrideTable) -> Self {
        if let Some(path) = overrides.source_path() {
            log::info!("Loaded {} device overrides from {}", overrides.len(), path.display());
        }
        self.overrides = overrides;
        self
    }

    pub fn with_watch(mut self, watch: Box<dyn DirectoryWatch>) -> Self {
        self.watch = Some(watch);
        self
    }

    /// Take over a terminal, muting it unless the settings say otherwise
    pub fn with_console(mut self, console: Box<dyn Console>) -> Self {
        self.tty = Some(TtySession::start(console, self.settings.mute_tty));
        self
    }

    /// Bring up the subsystem against the real kernel interfaces.
    ///
    /// Terminal and hot-plug setup failures are logged and the context runs
    /// without them. Only registry allocation failure is returned.
    #[cfg(feature = "pure-rust")]
    pub fn init(settings: InputSettings) -> SessionResult<Self> {
        use crate::console::VtConsole;
        use crate::device::evdev::EvdevOpener;
        use crate::hotplug::InotifyWatch;

        let overrides = match &settings.overrides_path {
            Some(path) => OverrideTable::from_file(path),
            None => OverrideTable::load_default(),
        }
        .unwrap_or_else(|e| {
            log::warn!("Device overrides not loaded: {}", e);
            OverrideTable::new()
        });

        let console = VtConsole::find(settings.tty_override.as_deref());
        let scan_dir = settings.scan_dir.clone();
        let mut context = Self::new(settings, Box::new(EvdevOpener))
            .with_overrides(overrides)
            .with_console(Box::new(console));

        match InotifyWatch::new(&scan_dir) {
            Ok(watch) => context.watch = Some(Box::new(watch)),
            Err(e) => log::warn!(
                "Hot-plug watch on {} failed ({}), device discovery disabled",
                scan_dir.display(),
                e
            ),
        }

        context.rescan()?;
        Ok(context)
    }

    pub fn settings(&self) -> &InputSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Stable id of the default pointer device
    pub fn mouse_id(&self) -> Option<u16> {
        self.mouse_id
    }

    pub fn has_watch(&self) -> bool {
        self.watch.is_some()
    }

    /// Whether the terminal keyboard is muted. While it is, interrupt
    /// signals should be ignored by whoever owns signal disposition.
    pub fn is_muted(&self) -> bool {
        self.tty.as_ref().map(TtySession::is_muted).unwrap_or(false)
    }

    fn note(&self, args: fmt::Arguments<'_>) {
        if self.settings.verbose {
            log::warn!("{}", args);
        } else {
            log::debug!("{}", args);
        }
    }

    /// Enumerate the scan directory once. Later calls do nothing until
    /// the context has been shut down.
    pub fn rescan(&mut self) -> SessionResult<usize> {
        if self.scanned {
            return Ok(0);
        }
        self.scanned = true;

        let entries = match scan_entries(&self.settings.scan_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.note(format_args!(
                    "Couldn't scan {}: {}",
                    self.settings.scan_dir.display(),
                    e
                ));
                return Ok(0);
            }
        };

        let mut added = 0;
        for path in entries {
            if self.attach(&path)?.is_some() {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Open and register one device node.
    ///
    /// Returns the slot it landed in, or `None` when the node was skipped.
    pub fn attach(&mut self, path: &Path) -> SessionResult<Option<usize>> {
        match self.opener.open(path) {
            Ok(source) => self.attach_source(source, path),
            Err(e) => {
                self.note(format_args!("Ignoring {}: {}", path.display(), e));
                Ok(None)
            }
        }
    }

    /// Identify, query, classify and register an already open source
    pub fn attach_source(
        &mut self,
        mut source: Box<dyn EventSource>,
        path: &Path,
    ) -> SessionResult<Option<usize>> {
        let identity = match identify(source.as_ref(), path) {
            Ok(identity) => identity,
            Err(e) => {
                self.note(format_args!("Identify failed, ignoring: {}", e));
                return Ok(None);
            }
        };
        let report = match probe(source.as_ref()) {
            Ok(report) => report,
            Err(e) => {
                self.note(format_args!("Probing {} failed: {}", path.display(), e));
                return Ok(None);
            }
        };

        let classification = classify(report, self.overrides.lookup(&identity.label));
        let kind = classification.kind();
        if kind == DeviceKind::Keyboard && self.repeat != KeyRepeat::default() {
            if let Err(e) = source.set_repeat(self.repeat) {
                self.note(format_args!("Key repeat not applied to {}: {}", identity.label, e));
            }
        }

        let node = crate::device::DeviceNode::new(
            source,
            &identity.label,
            &path.to_string_lossy(),
            identity.id,
            classification.decoder,
            classification.payload,
        )
        .with_masks(classification.masks);

        let placement = match self.registry.insert(node) {
            Ok(placement) => placement,
            Err(RegistryError::Full(limit)) => {
                log::warn!("Device limit ({}) reached, ignoring {}", limit, path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if kind == DeviceKind::Mouse && self.mouse_id.is_none() {
            self.mouse_id = Some(identity.id);
        }

        match placement {
            Placement::Added(slot) => self.note(format_args!(
                "Added {} ({}) as {} device {} in slot {}",
                identity.label,
                path.display(),
                kind,
                identity.id,
                slot
            )),
            Placement::Replaced(slot) => self.note(format_args!(
                "Device {} ({}) reconnected in slot {}",
                identity.id,
                path.display(),
                slot
            )),
        }
        Ok(Some(placement.slot()))
    }

    /// One non-blocking pass: poll every device and the hot-plug watch with
    /// a zero timeout, decode what is ready and pick up new nodes.
    ///
    /// Returns the number of ready descriptors serviced.
    pub fn process(&mut self, sink: &mut dyn EventSink) -> SessionResult<usize> {
        self.pollset.clear();
        self.pollset.extend_from_slice(self.registry.pollfds());
        let devices = self.pollset.len();
        if let Some(watch) = &self.watch {
            self.pollset.push(libc::pollfd {
                fd: watch.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            });
        }
        if self.pollset.is_empty() {
            return Ok(0);
        }

        let ready = unsafe {
            libc::poll(
                self.pollset.as_mut_ptr(),
                self.pollset.len() as libc::nfds_t,
                0,
            )
        };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(SessionError::Poll(err));
        }
        if ready == 0 {
            return Ok(0);
        }

        let mut serviced = 0;
        for slot in 0..devices {
            let revents = self.pollset[slot].revents;
            if self.pollset[slot].fd < 0 || revents == 0 {
                continue;
            }
            serviced += 1;
            if revents & libc::POLLNVAL != 0 {
                self.disconnect(slot, "descriptor is not open");
            } else {
                self.service(slot, sink);
            }
        }

        if self.pollset.len() > devices && self.pollset[devices].revents & libc::POLLIN != 0 {
            serviced += 1;
            self.discover_new()?;
        }
        Ok(serviced)
    }

    /// Read and decode one batch from a ready slot
    pub fn service(&mut self, slot: usize, sink: &mut dyn EventSink) {
        let Some(node) = self.registry.get_mut(slot) else {
            return;
        };
        self.reports.clear();
        let read = node.source_mut().read_events(&mut self.reports);
        match read {
            Ok(0) => self.disconnect(slot, "device went away"),
            Ok(_) => decode::decode(node, &self.reports, sink),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(e) => {
                let reason = e.to_string();
                self.disconnect(slot, &reason);
            }
        }
    }

    fn disconnect(&mut self, slot: usize, reason: &str) {
        if let Some(node) = self.registry.remove(slot) {
            self.note(format_args!(
                "Removed {} device {} ({}): {}",
                node.kind(),
                node.id(),
                node.label(),
                reason
            ));
        }
    }

    fn discover_new(&mut self) -> SessionResult<()> {
        let Some(watch) = self.watch.as_mut() else {
            return Ok(());
        };
        let names = match watch.drain() {
            Ok(names) => names,
            Err(e) => {
                log::warn!("Hot-plug watch read failed: {}", e);
                return Ok(());
            }
        };
        for name in names {
            let path: PathBuf = self.settings.scan_dir.join(&name);
            self.note(format_args!("Discovered {}", path.display()));
            self.attach(&path)?;
        }
        Ok(())
    }

    /// Resolve a device id to a registry slot.
    ///
    /// Negative ids name the default pointer, ids below `MAX_DEVICES` are
    /// positional and larger ids are stable identities.
    pub fn lookup(&self, devid: i32) -> Option<usize> {
        if devid < 0 {
            return self.mouse_id.and_then(|id| self.registry.find_by_id(id));
        }
        if devid < i32::from(MAX_DEVICES) {
            let slot = devid as usize;
            return self.registry.get(slot).map(|_| slot);
        }
        u16::try_from(devid)
            .ok()
            .and_then(|id| self.registry.find_by_id(id))
    }

    /// Input classes available from the live devices
    pub fn capabilities(&self) -> InputCapabilities {
        self.registry
            .iter()
            .fold(InputCapabilities::empty(), |caps, (_, node)| {
                caps | InputCapabilities::for_kind(node.kind())
            })
    }

    /// Filter configuration of one axis
    pub fn analog_state(&self, devid: i32, axis: usize) -> Result<AnalogConfig, DeviceError> {
        let node = self
            .lookup(devid)
            .and_then(|slot| self.registry.get(slot))
            .ok_or(DeviceError::NoSuchDevice(devid))?;
        node.payload
            .axis(axis)
            .map(|filter| filter.config())
            .ok_or(DeviceError::BadAxis { device: devid, axis })
    }

    /// Reconfigure one axis; window state and hysteresis reset
    pub fn set_analog_filter(
        &mut self,
        devid: i32,
        axis: usize,
        config: &AnalogConfig,
    ) -> Result<(), DeviceError> {
        let slot = self.lookup(devid).ok_or(DeviceError::NoSuchDevice(devid))?;
        let node = self
            .registry
            .get_mut(slot)
            .ok_or(DeviceError::NoSuchDevice(devid))?;
        let filter = node
            .payload
            .axis_mut(axis)
            .ok_or(DeviceError::BadAxis { device: devid, axis })?;
        filter.configure(config);
        Ok(())
    }

    /// Disable every axis (remembering its mode) or restore the remembered
    /// modes, optionally limited to mouse devices
    pub fn set_analog_all(&mut self, enable: bool, mouse_only: bool) {
        for (_, node) in self.registry.iter_mut() {
            if mouse_only && node.kind() != DeviceKind::Mouse {
                continue;
            }
            for filter in node.payload.filters_mut() {
                if enable {
                    filter.restore();
                } else {
                    filter.disable();
                }
            }
        }
    }

    /// Query or update keyboard repeat timing.
    ///
    /// Negative values leave that setting alone. Any update is pushed to
    /// every live keyboard. Returns the previous timing.
    pub fn key_repeat(&mut self, period: i32, delay: i32) -> KeyRepeat {
        let previous = self.repeat;
        if period < 0 && delay < 0 {
            return previous;
        }
        if period >= 0 {
            self.repeat.period = period;
        }
        if delay >= 0 {
            self.repeat.delay = delay;
        }

        let repeat = self.repeat;
        let verbose = self.settings.verbose;
        for (_, node) in self.registry.iter_mut() {
            if node.kind() != DeviceKind::Keyboard {
                continue;
            }
            if let Err(e) = node.source_mut().set_repeat(repeat) {
                if verbose {
                    log::warn!("Key repeat not applied to {}: {}", node.label(), e);
                } else {
                    log::debug!("Key repeat not applied to {}: {}", node.label(), e);
                }
            }
        }
        previous
    }

    /// Display label of a device
    pub fn device_label(&self, devid: i32) -> &str {
        if devid == -1 {
            return "mouse";
        }
        if devid < 0 {
            return "no device";
        }
        match self.lookup(devid).and_then(|slot| self.registry.get(slot)) {
            None => "no device",
            Some(node) if node.label().is_empty() => "no identifier",
            Some(node) => node.label(),
        }
    }

    /// Take or release exclusive access to a device
    pub fn device_lock(&mut self, devid: i32, lock: bool) -> Result<(), DeviceError> {
        let slot = self.lookup(devid).ok_or(DeviceError::NoSuchDevice(devid))?;
        let node = self
            .registry
            .get_mut(slot)
            .ok_or(DeviceError::NoSuchDevice(devid))?;
        node.source_mut()
            .set_grab(lock)
            .map_err(|source| DeviceError::Grab {
                device: devid,
                source,
            })
    }

    /// Every live device
    pub fn list_devices(&self) -> Vec<DeviceInfo> {
        self.registry
            .iter()
            .map(|(slot, node)| DeviceInfo {
                slot,
                id: node.id(),
                label: node.label().to_string(),
                path: node.path().to_string(),
                kind: node.kind(),
                decoder: node.decoder,
            })
            .collect()
    }

    /// Release everything: restore the terminal, drop the watch and close
    /// every device. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if let Some(mut tty) = self.tty.take() {
            tty.restore();
        }
        self.watch = None;
        let closed = self.registry.clear();
        if !closed.is_empty() {
            log::debug!("Closed {} input devices", closed.len());
        }
        self.scanned = false;
    }
}

impl Drop for InputContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

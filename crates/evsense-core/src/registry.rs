// Evsense Device Registry
// Stable-index device slots paired one to one with a poll set

use std::collections::TryReserveError;
use std::os::unix::io::RawFd;

use crate::device::DeviceNode;
use crate::input::identity::MAX_DEVICES;

/// Slots added each time the table runs out of holes
pub const GROW_STEP: usize = 8;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Could not grow the device table: {0}")]
    Allocation(#[from] TryReserveError),

    #[error("Device limit of {0} reached")]
    Full(usize),
}

/// One registry slot.
///
/// A vacated slot remembers the id of the node that left it so the same
/// device lands back in the same place when it reconnects.
#[derive(Debug)]
pub enum Slot {
    Vacant,
    Vacated { id: u16 },
    Live(DeviceNode),
}

impl Slot {
    pub fn node(&self) -> Option<&DeviceNode> {
        match self {
            Slot::Live(node) => Some(node),
            _ => None,
        }
    }

    fn id(&self) -> Option<u16> {
        match self {
            Slot::Vacant => None,
            Slot::Vacated { id } => Some(*id),
            Slot::Live(node) => Some(node.id()),
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Slot::Live(_))
    }
}

/// Where an inserted node ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Took over a hole or a freshly grown slot
    Added(usize),
    /// A live node with the same id swapped in the new source
    Replaced(usize),
}

impl Placement {
    pub fn slot(self) -> usize {
        match self {
            Placement::Added(slot) | Placement::Replaced(slot) => slot,
        }
    }
}

fn hole_fd() -> libc::pollfd {
    libc::pollfd {
        fd: -1,
        events: 0,
        revents: 0,
    }
}

fn live_fd(fd: RawFd) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

/// Device table with a poll set of equal length and equal indexing.
///
/// Slot indices never move: growth appends, removal leaves a hole.
pub struct Registry {
    slots: Vec<Slot>,
    pollfds: Vec<libc::pollfd>,
    len: usize,
    live: usize,
    limit: usize,
}

impl Registry {
    pub fn new() -> Self {
        Self::with_limit(MAX_DEVICES as usize)
    }

    /// Registry that refuses new devices beyond `limit` live nodes
    pub fn with_limit(limit: usize) -> Self {
        Self {
            slots: Vec::new(),
            pollfds: Vec::new(),
            len: 0,
            live: 0,
            limit,
        }
    }

    /// One past the highest slot that has held a live node
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Number of live nodes
    pub fn live(&self) -> usize {
        self.live
    }

    /// Allocated slots, live or not
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Option<&Slot> {
        self.slots.get(index)
    }

    pub fn get(&self, index: usize) -> Option<&DeviceNode> {
        self.slots.get(index).and_then(Slot::node)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut DeviceNode> {
        match self.slots.get_mut(index) {
            Some(Slot::Live(node)) => Some(node),
            _ => None,
        }
    }

    /// Slot of the live node with a stable id
    pub fn find_by_id(&self, id: u16) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Slot::Live(node) if node.id() == id))
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &DeviceNode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.node().map(|node| (index, node)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut DeviceNode)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| match slot {
                Slot::Live(node) => Some((index, node)),
                _ => None,
            })
    }

    /// Poll entries for the used part of the table; holes carry fd -1
    pub fn pollfds(&self) -> &[libc::pollfd] {
        &self.pollfds[..self.len]
    }

    /// Insert a node.
    ///
    /// A live node with the same id keeps its slot and state and takes the
    /// new node's source; the old source is closed. A vacated slot that
    /// last held the same id is reused. Otherwise the first hole is taken,
    /// growing the table by `GROW_STEP` when there is none.
    pub fn insert(&mut self, node: DeviceNode) -> RegistryResult<Placement> {
        let id = node.id();
        if let Some(index) = self.slots.iter().position(|slot| slot.id() == Some(id)) {
            if let Slot::Live(existing) = &mut self.slots[index] {
                let path = node.path().to_string();
                let old = existing.replace_source(node.into_source(), &path);
                drop(old);
                self.pollfds[index] = live_fd(existing.source().raw_fd());
                return Ok(Placement::Replaced(index));
            }
            self.check_limit()?;
            self.place(index, node);
            return Ok(Placement::Added(index));
        }

        self.check_limit()?;
        let index = match self.slots.iter().position(|slot| !slot.is_live()) {
            Some(index) => index,
            None => self.grow()?,
        };
        self.place(index, node);
        Ok(Placement::Added(index))
    }

    fn check_limit(&self) -> RegistryResult<()> {
        if self.live >= self.limit {
            return Err(RegistryError::Full(self.limit));
        }
        Ok(())
    }

    fn place(&mut self, index: usize, node: DeviceNode) {
        self.pollfds[index] = live_fd(node.source().raw_fd());
        self.slots[index] = Slot::Live(node);
        self.live += 1;
        self.len = self.len.max(index + 1);
    }

    /// Append `GROW_STEP` holes and return the first of them
    fn grow(&mut self) -> RegistryResult<usize> {
        let first = self.slots.len();
        self.slots.try_reserve(GROW_STEP)?;
        self.pollfds.try_reserve(GROW_STEP)?;
        for _ in 0..GROW_STEP {
            self.slots.push(Slot::Vacant);
            self.pollfds.push(hole_fd());
        }
        log::debug!("Device table grown to {} slots", self.slots.len());
        Ok(first)
    }

    /// Remove the node in a slot, closing its source when the returned
    /// node is dropped.
    pub fn remove(&mut self, index: usize) -> Option<DeviceNode> {
        let slot = self.slots.get_mut(index)?;
        let id = match slot {
            Slot::Live(node) => node.id(),
            _ => return None,
        };
        let Slot::Live(node) = std::mem::replace(slot, Slot::Vacated { id }) else {
            return None;
        };
        self.pollfds[index] = hole_fd();
        self.live -= 1;
        while self.len > 0 && !self.slots[self.len - 1].is_live() {
            self.len -= 1;
        }
        Some(node)
    }

    /// Drop every node, keeping the allocated slots
    pub fn clear(&mut self) -> Vec<DeviceNode> {
        let mut removed = Vec::with_capacity(self.live);
        for index in 0..self.slots.len() {
            if let Some(node) = self.remove(index) {
                removed.push(node);
            }
        }
        removed
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

//! Handle registry: the single source of truth for handle -> open port.
//!
//! The table lock only guards map mutation and lookup; callers clone the
//! per-port `Arc` out and do I/O under the port's own lock, so the table is
//! never blocked behind a slow read.

use crate::port::{PortConfig, PortError, SerialTransport};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Opaque identifier for one open port session.
///
/// Unique among currently-open ports; an id is only handed out again after
/// the close that freed it. Cannot be fabricated from a raw integer outside
/// the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PortHandle(u32);

impl PortHandle {
    /// The numeric id, for display and logging only.
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for PortHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything owned by one open port.
///
/// Created on open, mutated only through the owning session's operations,
/// destroyed on close. Dropping the transport releases the descriptor
/// unconditionally.
pub(crate) struct PortState {
    pub transport: Box<dyn SerialTransport>,
    pub config: PortConfig,
    pub path: String,
    pub bytes_read_total: u64,
    pub bytes_written_total: u64,
}

impl PortState {
    pub(crate) fn new(transport: Box<dyn SerialTransport>, config: PortConfig, path: String) -> Self {
        Self {
            transport,
            config,
            path,
            bytes_read_total: 0,
            bytes_written_total: 0,
        }
    }
}

struct RegistryInner {
    ports: HashMap<PortHandle, Arc<Mutex<PortState>>>,
    /// Ids freed by close, reused smallest-first before the counter advances.
    free_ids: BTreeSet<u32>,
    next_id: u32,
}

/// Maps handles to open-port state under one exclusive lock.
pub(crate) struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                ports: HashMap::new(),
                free_ids: BTreeSet::new(),
                next_id: 1,
            }),
        }
    }

    /// Register an opened port and allocate its handle.
    pub(crate) fn insert(&self, state: PortState) -> PortHandle {
        let mut inner = self.inner.lock();
        let id = match inner.free_ids.pop_first() {
            Some(id) => id,
            None => {
                let id = inner.next_id;
                inner.next_id += 1;
                id
            }
        };
        let handle = PortHandle(id);
        inner.ports.insert(handle, Arc::new(Mutex::new(state)));
        handle
    }

    /// Look up the state for a handle.
    pub(crate) fn get(&self, handle: PortHandle) -> Result<Arc<Mutex<PortState>>, PortError> {
        self.inner
            .lock()
            .ports
            .get(&handle)
            .cloned()
            .ok_or(PortError::InvalidHandle(handle.0))
    }

    /// Remove a handle, freeing its id for reuse.
    ///
    /// Returns `None` when the handle is unknown or already closed.
    pub(crate) fn remove(&self, handle: PortHandle) -> Option<Arc<Mutex<PortState>>> {
        let mut inner = self.inner.lock();
        let state = inner.ports.remove(&handle)?;
        inner.free_ids.insert(handle.0);
        Some(state)
    }

    /// Handles of all currently-open ports, in ascending order.
    pub(crate) fn handles(&self) -> Vec<PortHandle> {
        let inner = self.inner.lock();
        let mut handles: Vec<_> = inner.ports.keys().copied().collect();
        handles.sort();
        handles
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().ports.len()
    }
}

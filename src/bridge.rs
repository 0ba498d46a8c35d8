//! The stable entry-point surface over the registry and sessions.
//!
//! One method per operation, no logic beyond lookup and error translation.
//! A process-global instance is available for callers that want a single
//! shared port table.

use crate::port::{
    self, NativeOpener, PortConfig, PortError, PortInfo, SerialTransport, TransportOpener,
};
use crate::registry::{PortHandle, PortState, Registry};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Snapshot of one open port: its configuration and I/O counters.
#[derive(Debug, Clone, Serialize)]
pub struct PortStatus {
    pub handle: PortHandle,
    pub path: String,
    pub config: PortConfig,
    pub bytes_read_total: u64,
    pub bytes_written_total: u64,
}

/// Serial port access by opaque handle.
///
/// Handles move `Closed -> Open` on [`open`](Self::open) and back on
/// [`close`](Self::close); configure does not change state, and close on a
/// closed handle is a no-op. Operations on distinct handles run
/// concurrently; two callers on the same handle take turns, in no promised
/// order.
///
/// # Example
/// ```
/// use serial_bridge::{MockOpener, PortConfig, SerialBridge};
///
/// let bridge = SerialBridge::with_opener(Box::new(MockOpener::echoing()));
/// let handle = bridge.open("/mock/ttyA", PortConfig::default())?;
///
/// assert_eq!(bridge.write(handle, b"Kx")?, 2);
/// assert_eq!(bridge.read(handle, 64, None)?, b"Kx");
///
/// bridge.close(handle);
/// # Ok::<(), serial_bridge::PortError>(())
/// ```
pub struct SerialBridge {
    registry: Registry,
    opener: Box<dyn TransportOpener>,
}

impl SerialBridge {
    /// A bridge backed by real hardware ports.
    pub fn new() -> Self {
        Self::with_opener(Box::new(NativeOpener))
    }

    /// A bridge backed by a custom opener (mocks in tests).
    pub fn with_opener(opener: Box<dyn TransportOpener>) -> Self {
        Self {
            registry: Registry::new(),
            opener,
        }
    }

    /// Open and configure a device, returning its handle.
    pub fn open(&self, path: &str, config: PortConfig) -> Result<PortHandle, PortError> {
        config.validate()?;
        let transport = self.opener.open(path, &config)?;
        let handle = self
            .registry
            .insert(PortState::new(transport, config, path.to_string()));
        debug!(%handle, port = %path, "opened");
        Ok(handle)
    }

    /// Open a device with the default 9600-8N1 configuration.
    pub fn open_default(&self, path: &str) -> Result<PortHandle, PortError> {
        self.open(path, PortConfig::default())
    }

    /// Read up to `max_bytes`, waiting at most `timeout` (the port's default
    /// when `None`) for the first byte.
    pub fn read(
        &self,
        handle: PortHandle,
        max_bytes: usize,
        timeout: Option<Duration>,
    ) -> Result<Vec<u8>, PortError> {
        let port = self.registry.get(handle)?;
        let mut state = port.lock();
        state.read_up_to(max_bytes, timeout)
    }

    /// Write the whole payload, returning its length.
    pub fn write(&self, handle: PortHandle, data: &[u8]) -> Result<usize, PortError> {
        let port = self.registry.get(handle)?;
        let mut state = port.lock();
        state.write_all(data)
    }

    /// Re-apply a full line configuration to an open port.
    pub fn configure(&self, handle: PortHandle, config: PortConfig) -> Result<(), PortError> {
        let port = self.registry.get(handle)?;
        let mut state = port.lock();
        state.reconfigure(&config)
    }

    /// Close a handle. Idempotent: unknown or already-closed handles are a
    /// no-op, and release failures are logged, never surfaced.
    pub fn close(&self, handle: PortHandle) {
        match self.registry.remove(handle) {
            Some(port) => {
                let mut state = port.lock();
                if let Err(e) = state.transport.flush() {
                    warn!(%handle, port = %state.path, error = %e, "flush during close failed");
                }
                debug!(%handle, port = %state.path, "closed");
            }
            None => debug!(%handle, "close on unknown handle ignored"),
        }
    }

    /// Configuration and counters for an open handle.
    pub fn status(&self, handle: PortHandle) -> Result<PortStatus, PortError> {
        let port = self.registry.get(handle)?;
        let state = port.lock();
        Ok(PortStatus {
            handle,
            path: state.path.clone(),
            config: state.config.clone(),
            bytes_read_total: state.bytes_read_total,
            bytes_written_total: state.bytes_written_total,
        })
    }

    /// Handles of all currently-open ports, ascending.
    pub fn open_handles(&self) -> Vec<PortHandle> {
        self.registry.handles()
    }

    /// Number of currently-open ports.
    pub fn open_count(&self) -> usize {
        self.registry.len()
    }

    /// Enumerate serial devices visible to the OS.
    ///
    /// Always asks the native driver, whatever opener backs this bridge.
    pub fn list_ports(&self) -> Result<Vec<PortInfo>, PortError> {
        port::list_ports()
    }
}

impl Default for SerialBridge {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Lazy<SerialBridge> = Lazy::new(SerialBridge::new);

/// The process-global bridge, created on first use.
pub fn global() -> &'static SerialBridge {
    &GLOBAL
}

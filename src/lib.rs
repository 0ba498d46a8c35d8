//! serial-bridge
//!
//! Cross-platform serial port access by opaque handle: open, configure,
//! read, write and close, with multiple ports open at once.
//!
//! # Modules
//!
//! - `port`: line configuration, the transport trait, the native driver
//!   implementation and a mock for tests
//! - `registry`: handle allocation and the handle -> port table
//! - `bridge`: the stable entry-point surface
//! - `config`: TOML configuration with environment overrides
//!
//! # Example
//!
//! ```no_run
//! use serial_bridge::{PortConfig, SerialBridge};
//!
//! let bridge = SerialBridge::new();
//! let handle = bridge.open("/dev/ttyUSB0", PortConfig::default())?;
//!
//! bridge.write(handle, b"Kx")?;
//! let reply = bridge.read(handle, 64, None)?;
//! println!("{}", String::from_utf8_lossy(&reply));
//!
//! bridge.close(handle);
//! # Ok::<(), serial_bridge::PortError>(())
//! ```

pub mod bridge;
pub mod config;
pub mod port;
pub mod registry;

mod session;

// Re-export commonly used types for convenience
pub use bridge::{global, PortStatus, SerialBridge};
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
pub use port::{
    list_ports, DataBits, FlowControl, MockOpener, MockTransport, NativeOpener, NativeTransport,
    Parity, PortConfig, PortError, PortInfo, PortKind, SerialTransport, StopBits, TransportOpener,
};
pub use registry::PortHandle;

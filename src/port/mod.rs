//! Port abstraction layer.
//!
//! Line configuration types, the transport trait, the native driver-backed
//! implementation and a mock for tests.

pub mod error;
pub mod mock;
pub mod native;
pub mod traits;

pub use error::PortError;
pub use mock::{MockOpener, MockTransport};
pub use native::{list_ports, NativeOpener, NativeTransport, PortInfo, PortKind};
pub use traits::*;

//! Byte-channel abstraction for a host/controller serial link.
//!
//! This is the lowest layer of robolink. The framing and link layers only
//! ever see a [`Transport`]: open/close/read/write over raw bytes. The
//! concrete implementation talks to a serial port through the `serialport`
//! crate; a scripted in-memory transport is available behind the `mock`
//! feature for tests.

pub mod config;
pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod serial;
pub mod traits;

pub use config::{FlowControl, Parity, SerialConfig, StopBits, DEFAULT_READ_TIMEOUT};
pub use error::{Result, TransportError};
pub use serial::{list_ports, PortSummary, SerialTransport};
pub use traits::{SharedTransport, Transport, TransportReader, TransportWriter};

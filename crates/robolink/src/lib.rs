//! Serial bridge between a host computer and an embedded robot controller.
//!
//! The controller streams checksummed telemetry frames (IMU, referee system
//! state, debug values); the host streams a command record back at a fixed
//! rate. A supervisor reopens the port whenever either direction fails.
//!
//! # Crate Structure
//!
//! - [`transport`]: Serial byte channel and its configuration
//! - [`frame`]: CRC8/CRC16 packet framing and the message catalog
//! - [`link`]: Link health, supervisor, receive/send loops, [`link::Bridge`]

/// Re-export transport types.
pub mod transport {
    pub use robolink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use robolink_frame::*;
}

/// Re-export link types.
pub mod link {
    pub use robolink_link::*;
}

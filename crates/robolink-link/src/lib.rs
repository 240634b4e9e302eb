//! Supervised host/controller link.
//!
//! Three workers share one [`Transport`](robolink_transport::Transport):
//! the [`Supervisor`] reopens the port whenever [`LinkHealth`] drops, the
//! [`ReceiveLoop`] decodes inbound frames into a [`TelemetrySink`], and the
//! [`SendLoop`] streams the current [`CommandState`] at a fixed period.
//! [`Bridge`] spawns and joins all three.

pub mod bridge;
pub mod command;
pub mod error;
pub mod health;
pub mod receiver;
pub mod sender;
pub mod sink;
pub mod supervisor;

pub use bridge::{Bridge, BridgeConfig};
pub use command::{CommandHandle, CommandState};
pub use error::{LinkError, Result};
pub use health::LinkHealth;
pub use receiver::{ReceiveLoop, ReceiveOutcome};
pub use sender::{SendLoop, SendOutcome};
pub use sink::{dispatch, TelemetrySink};
pub use supervisor::Supervisor;

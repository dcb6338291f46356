//! MavShell Library
//!
//! Interactive shell to a flight controller, tunneled over the MAVLink
//! SERIAL_CONTROL message on a serial, UDP or TCP link.

pub mod cli;
pub mod core;
pub mod domain;
pub mod infrastructure;

pub use crate::core::{Interrupt, SerialTunnel, SessionOutcome, ShellLoop, ShellState};
pub use crate::domain::config::ShellConfig;
pub use crate::domain::error::{ShellError, ShellResult};
pub use crate::infrastructure::link::{Endpoint, MavlinkLink, TelemetryLink};

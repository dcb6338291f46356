// Link module - Telemetry link contract and its MAVLink adapter
//
// The shell core only talks to `TelemetryLink`. How frames get onto the wire
// (serial, TCP, UDP) and how they are encoded lives behind it.
pub mod codec;
pub mod endpoint;
pub mod fake;
pub mod io;
pub mod mavlink;

use crate::domain::error::ShellResult;
use async_trait::async_trait;
use std::ops::BitOr;
use std::time::Duration;

pub use endpoint::Endpoint;
pub use fake::FakeLink;
pub use mavlink::MavlinkLink;

/// Payload bytes carried by one control frame
pub const FRAME_PAYLOAD_CAPACITY: usize = 70;

/// Flag bits of a serial control frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlFlags(u8);

impl ControlFlags {
    /// Frame is a reply from the device
    pub const REPLY: ControlFlags = ControlFlags(1);
    /// Device should send its output back
    pub const RESPOND: ControlFlags = ControlFlags(2);
    /// Request exclusive use of the channel
    pub const EXCLUSIVE: ControlFlags = ControlFlags(4);
    /// Block on writes to the device
    pub const BLOCKING: ControlFlags = ControlFlags(8);
    /// Send multiple replies until the port is drained
    pub const MULTI: ControlFlags = ControlFlags(16);

    pub const fn empty() -> Self {
        ControlFlags(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        ControlFlags(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: ControlFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ControlFlags {
    type Output = ControlFlags;

    fn bitor(self, rhs: ControlFlags) -> ControlFlags {
        ControlFlags(self.0 | rhs.0)
    }
}

/// One serial control frame as seen by the shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialControlFrame {
    /// Channel (serial control device) the frame addresses
    pub device: u8,
    pub flags: ControlFlags,
    /// Baud rate change request, 0 for no change
    pub baudrate: u32,
    /// Device side timeout in milliseconds
    pub timeout: u16,
    /// Number of valid bytes in `data`
    pub count: u8,
    pub data: [u8; FRAME_PAYLOAD_CAPACITY],
}

impl SerialControlFrame {
    /// Build a data frame for `chunk`, zero padding the payload.
    ///
    /// `chunk` must not exceed the payload capacity.
    pub fn data(device: u8, flags: ControlFlags, chunk: &[u8]) -> Self {
        debug_assert!(chunk.len() <= FRAME_PAYLOAD_CAPACITY);
        let mut data = [0u8; FRAME_PAYLOAD_CAPACITY];
        data[..chunk.len()].copy_from_slice(chunk);

        Self {
            device,
            flags,
            baudrate: 0,
            timeout: 0,
            count: chunk.len() as u8,
            data,
        }
    }

    /// Frame with every field zeroed apart from the device
    pub fn release(device: u8) -> Self {
        Self::data(device, ControlFlags::empty(), &[])
    }

    /// The valid part of the payload
    pub fn payload(&self) -> &[u8] {
        let count = (self.count as usize).min(FRAME_PAYLOAD_CAPACITY);
        &self.data[..count]
    }
}

/// Which received frames a receive call accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFilter {
    pub device: u8,
    pub require_data: bool,
}

impl FrameFilter {
    /// Frames on `device` carrying at least one byte
    pub fn with_data(device: u8) -> Self {
        Self {
            device,
            require_data: true,
        }
    }

    pub fn matches(&self, frame: &SerialControlFrame) -> bool {
        frame.device == self.device && (!self.require_data || frame.count != 0)
    }
}

/// Framed control channel to the remote device
#[async_trait]
pub trait TelemetryLink: Send {
    /// Wait until the remote end proves it is alive, failing after `timeout`
    async fn wait_heartbeat(&mut self, timeout: Duration) -> ShellResult<()>;

    /// Send one frame without waiting for an acknowledgement
    async fn send_frame(&mut self, frame: &SerialControlFrame) -> ShellResult<()>;

    /// Wait up to `timeout` for a frame accepted by `filter`
    async fn receive_frame(
        &mut self,
        filter: &FrameFilter,
        timeout: Duration,
    ) -> ShellResult<Option<SerialControlFrame>>;
}

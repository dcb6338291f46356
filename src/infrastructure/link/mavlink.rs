use super::codec::{
    decode_heartbeat, decode_serial_control, encode_serial_control, FrameDecoder, FrameEncoder,
    MavVersion, RawFrame, MSG_ID_HEARTBEAT, MSG_ID_SERIAL_CONTROL,
};
use super::io::LinkIo;
use super::{Endpoint, FrameFilter, SerialControlFrame, TelemetryLink};
use crate::domain::config::LinkSettings;
use crate::domain::error::{ShellError, ShellResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

/// MAV_TYPE_GCS, ignored when looking for the vehicle's heartbeat
const MAV_TYPE_GCS: u8 = 6;

const READ_BUFFER_SIZE: usize = 2048;

/// Identity of the system that answered our liveness wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteSystem {
    pub system_id: u8,
    pub component_id: u8,
    pub version: MavVersion,
    pub mav_type: u8,
    pub autopilot: u8,
}

/// Telemetry link speaking MAVLink over a serial, TCP or UDP transport
pub struct MavlinkLink {
    io: LinkIo,
    decoder: FrameDecoder,
    encoder: FrameEncoder,
    remote: Option<RemoteSystem>,
    read_buf: Vec<u8>,
}

impl MavlinkLink {
    /// Open the transport behind `endpoint`. Does not wait for a heartbeat.
    pub async fn connect(endpoint: &Endpoint, baud: u32, settings: &LinkSettings) -> ShellResult<Self> {
        debug!("Connecting with MAVLink to {}", endpoint);
        let io = LinkIo::open(endpoint, baud, settings.connect_timeout()).await?;
        Ok(Self::from_io(io, settings.system_id, settings.component_id))
    }

    pub fn from_io(io: LinkIo, system_id: u8, component_id: u8) -> Self {
        Self {
            io,
            decoder: FrameDecoder::new(),
            encoder: FrameEncoder::new(system_id, component_id),
            remote: None,
            read_buf: vec![0u8; READ_BUFFER_SIZE],
        }
    }

    /// The vehicle seen by the last successful heartbeat wait
    pub fn remote(&self) -> Option<&RemoteSystem> {
        self.remote.as_ref()
    }

    async fn next_frame(&mut self, deadline: Instant) -> ShellResult<Option<RawFrame>> {
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Ok(Some(frame));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            let n = self.io.read_some(&mut self.read_buf, deadline - now).await?;
            if n > 0 {
                trace!("link rx {} bytes: {}", n, hex::encode(&self.read_buf[..n]));
                self.decoder.feed(&self.read_buf[..n]);
            }
        }
    }
}

#[async_trait]
impl TelemetryLink for MavlinkLink {
    async fn wait_heartbeat(&mut self, timeout: Duration) -> ShellResult<()> {
        let deadline = Instant::now() + timeout;

        while let Some(frame) = self.next_frame(deadline).await? {
            if frame.message_id != MSG_ID_HEARTBEAT {
                continue;
            }
            let heartbeat = decode_heartbeat(&frame.payload)?;
            if heartbeat.mav_type == MAV_TYPE_GCS {
                debug!("Ignoring heartbeat from GCS system {}", frame.system_id);
                continue;
            }

            let remote = RemoteSystem {
                system_id: frame.system_id,
                component_id: frame.component_id,
                version: frame.version,
                mav_type: heartbeat.mav_type,
                autopilot: heartbeat.autopilot,
            };
            info!(
                "Heartbeat from system {} component {} ({:?})",
                remote.system_id, remote.component_id, remote.version
            );
            self.remote = Some(remote);
            return Ok(());
        }

        Err(ShellError::LivenessTimeout(timeout))
    }

    async fn send_frame(&mut self, frame: &SerialControlFrame) -> ShellResult<()> {
        let (version, target) = match &self.remote {
            Some(remote) if remote.version == MavVersion::V2 => {
                (MavVersion::V2, Some((remote.system_id, remote.component_id)))
            }
            _ => (MavVersion::V1, None),
        };

        let payload = encode_serial_control(frame, target);
        let bytes = self.encoder.encode(version, MSG_ID_SERIAL_CONTROL, &payload)?;
        trace!(
            "SERIAL_CONTROL tx device {} flags {:#04x} count {}: {}",
            frame.device,
            frame.flags.bits(),
            frame.count,
            hex::encode(frame.payload())
        );
        self.io.write_all(&bytes).await
    }

    async fn receive_frame(
        &mut self,
        filter: &FrameFilter,
        timeout: Duration,
    ) -> ShellResult<Option<SerialControlFrame>> {
        let deadline = Instant::now() + timeout;

        while let Some(raw) = self.next_frame(deadline).await? {
            if raw.message_id != MSG_ID_SERIAL_CONTROL {
                continue;
            }
            let frame = decode_serial_control(&raw.payload)?;
            if filter.matches(&frame) {
                trace!(
                    "SERIAL_CONTROL rx device {} count {}: {}",
                    frame.device,
                    frame.count,
                    hex::encode(frame.payload())
                );
                return Ok(Some(frame));
            }
            trace!("Dropping SERIAL_CONTROL for device {} count {}", frame.device, frame.count);
        }

        Ok(None)
    }
}

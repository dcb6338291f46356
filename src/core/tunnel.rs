use crate::domain::config::LinkSettings;
use crate::domain::error::ShellResult;
use crate::infrastructure::link::{
    ControlFlags, Endpoint, FrameFilter, MavlinkLink, SerialControlFrame, TelemetryLink,
    FRAME_PAYLOAD_CAPACITY,
};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Byte stream over the framed serial control channel of a telemetry link.
///
/// Outgoing bytes are cut into payload sized chunks, one frame each. Incoming
/// frame payloads are queued and handed out in order by `read`.
pub struct SerialTunnel<L: TelemetryLink> {
    link: L,
    channel: u8,
    receive_timeout: Duration,
    inbound: VecDeque<u8>,
    closed: bool,
}

impl SerialTunnel<MavlinkLink> {
    /// Connect to `endpoint` and wait until the vehicle is heard from
    pub async fn open(
        endpoint: &Endpoint,
        baud: u32,
        channel: u8,
        settings: &LinkSettings,
    ) -> ShellResult<Self> {
        let link = MavlinkLink::connect(endpoint, baud, settings).await?;
        Self::establish(link, channel, settings).await
    }
}

impl<L: TelemetryLink> SerialTunnel<L> {
    /// Take ownership of a connected link and block until it shows liveness
    pub async fn establish(mut link: L, channel: u8, settings: &LinkSettings) -> ShellResult<Self> {
        link.wait_heartbeat(settings.liveness_timeout()).await?;
        info!("Link alive, using serial control channel {}", channel);

        Ok(Self {
            link,
            channel,
            receive_timeout: settings.receive_timeout(),
            inbound: VecDeque::new(),
            closed: false,
        })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// Bytes received but not yet read
    pub fn buffered(&self) -> usize {
        self.inbound.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    /// Send `data` to the remote channel
    pub async fn write(&mut self, data: &[u8]) -> ShellResult<()> {
        trace!("sending {} bytes on channel {}", data.len(), self.channel);
        let flags = ControlFlags::EXCLUSIVE | ControlFlags::RESPOND;

        for chunk in data.chunks(FRAME_PAYLOAD_CAPACITY) {
            let frame = SerialControlFrame::data(self.channel, flags, chunk);
            self.link.send_frame(&frame).await?;
        }
        Ok(())
    }

    /// Return up to `max_len` received bytes, possibly none.
    ///
    /// Only touches the link when nothing is buffered, and then for a single
    /// bounded receive attempt.
    pub async fn read(&mut self, max_len: usize) -> ShellResult<Vec<u8>> {
        if self.inbound.is_empty() {
            self.receive().await?;
        }

        let n = max_len.min(self.inbound.len());
        Ok(self.inbound.drain(..n).collect())
    }

    async fn receive(&mut self) -> ShellResult<()> {
        let filter = FrameFilter::with_data(self.channel);
        if let Some(frame) = self.link.receive_frame(&filter, self.receive_timeout).await? {
            trace!("received {} bytes on channel {}", frame.count, self.channel);
            self.inbound.extend(frame.payload());
        }
        Ok(())
    }

    /// Release exclusive use of the remote channel. Later calls do nothing.
    pub async fn close(&mut self) -> ShellResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        debug!("Releasing serial control channel {}", self.channel);
        self.link.send_frame(&SerialControlFrame::release(self.channel)).await
    }
}

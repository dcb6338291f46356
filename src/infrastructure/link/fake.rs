// Scripted in-memory link for exercising the tunnel and shell without hardware
use super::{FrameFilter, SerialControlFrame, TelemetryLink};
use crate::domain::error::{ShellError, ShellResult};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// One scripted receive event
#[derive(Debug, Clone)]
pub enum FakeEntry {
    /// Frame delivered to the next receive call that accepts it
    Frame(SerialControlFrame),
    /// Transport failure reported by the next receive call
    Fail(String),
}

#[derive(Debug, Default)]
struct FakeState {
    incoming: VecDeque<FakeEntry>,
    sent: Vec<SerialControlFrame>,
    alive: bool,
    heartbeat_waits: usize,
    receive_calls: usize,
    fail_sends: Option<String>,
    wait_when_idle: bool,
}

/// Test double for [`TelemetryLink`]; clones share one script and one record of sent frames.
///
/// Public so integration tests can drive the tunnel and shell without a vehicle.
/// Nothing in the binary constructs it.
#[derive(Debug, Clone, Default)]
pub struct FakeLink {
    state: Arc<Mutex<FakeState>>,
}

impl FakeLink {
    /// A link whose remote end answers the liveness check
    pub fn new() -> Self {
        let link = Self::default();
        link.state().alive = true;
        link
    }

    /// A link that never produces a heartbeat
    pub fn silent() -> Self {
        Self::default()
    }

    /// Make idle receive calls sleep for their full timeout instead of returning at once
    pub fn wait_when_idle(self) -> Self {
        self.state().wait_when_idle = true;
        self
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push_frame(&self, frame: SerialControlFrame) {
        self.state().incoming.push_back(FakeEntry::Frame(frame));
    }

    pub fn push_failure(&self, message: &str) {
        self.state().incoming.push_back(FakeEntry::Fail(message.to_string()));
    }

    /// Make every following send fail
    pub fn fail_sends(&self, message: &str) {
        self.state().fail_sends = Some(message.to_string());
    }

    pub fn sent(&self) -> Vec<SerialControlFrame> {
        self.state().sent.clone()
    }

    pub fn heartbeat_waits(&self) -> usize {
        self.state().heartbeat_waits
    }

    pub fn receive_calls(&self) -> usize {
        self.state().receive_calls
    }

    pub fn pending(&self) -> usize {
        self.state().incoming.len()
    }
}

fn broken(message: String) -> ShellError {
    ShellError::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, message))
}

#[async_trait]
impl TelemetryLink for FakeLink {
    async fn wait_heartbeat(&mut self, timeout: Duration) -> ShellResult<()> {
        let alive = {
            let mut state = self.state();
            state.heartbeat_waits += 1;
            state.alive
        };
        if alive {
            Ok(())
        } else {
            tokio::time::sleep(timeout).await;
            Err(ShellError::LivenessTimeout(timeout))
        }
    }

    async fn send_frame(&mut self, frame: &SerialControlFrame) -> ShellResult<()> {
        let mut state = self.state();
        if let Some(message) = &state.fail_sends {
            return Err(broken(message.clone()));
        }
        state.sent.push(frame.clone());
        Ok(())
    }

    async fn receive_frame(
        &mut self,
        filter: &FrameFilter,
        timeout: Duration,
    ) -> ShellResult<Option<SerialControlFrame>> {
        let wait = {
            let mut state = self.state();
            state.receive_calls += 1;
            while let Some(entry) = state.incoming.pop_front() {
                match entry {
                    FakeEntry::Frame(frame) if filter.matches(&frame) => return Ok(Some(frame)),
                    FakeEntry::Frame(_) => continue,
                    FakeEntry::Fail(message) => return Err(broken(message)),
                }
            }
            state.wait_when_idle
        };

        if wait {
            tokio::time::sleep(timeout).await;
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::link::ControlFlags;

    #[tokio::test]
    async fn test_fake_scripts_frames_and_failures() {
        let probe = FakeLink::new();
        let mut link = probe.clone();
        probe.push_frame(SerialControlFrame::data(3, ControlFlags::REPLY, b"other"));
        probe.push_frame(SerialControlFrame::data(10, ControlFlags::REPLY, b"mine"));
        probe.push_failure("unplugged");

        let filter = FrameFilter::with_data(10);
        let frame = link.receive_frame(&filter, Duration::ZERO).await.unwrap().unwrap();
        assert_eq!(frame.payload(), b"mine");
        assert!(link.receive_frame(&filter, Duration::ZERO).await.is_err());
        assert!(link.receive_frame(&filter, Duration::ZERO).await.unwrap().is_none());
        assert_eq!(probe.receive_calls(), 3);
        assert_eq!(probe.pending(), 0);
    }

    #[tokio::test]
    async fn test_silent_link_times_out() {
        let mut link = FakeLink::silent();
        let err = link.wait_heartbeat(Duration::from_millis(5)).await.unwrap_err();
        assert!(matches!(err, ShellError::LivenessTimeout(_)));
    }

    #[tokio::test]
    async fn test_send_records_and_fails() {
        let probe = FakeLink::new();
        let mut link = probe.clone();
        link.send_frame(&SerialControlFrame::release(10)).await.unwrap();
        probe.fail_sends("gone");
        assert!(link.send_frame(&SerialControlFrame::release(10)).await.is_err());
        assert_eq!(probe.sent().len(), 1);
    }
}

use crate::core::input::{InputEvent, LineSource};
use crate::core::interrupt::Interrupt;
use crate::core::tunnel::SerialTunnel;
use crate::domain::config::TerminalSettings;
use crate::domain::error::{ShellError, ShellResult};
use crate::infrastructure::link::TelemetryLink;
use crossterm::{cursor, queue, terminal};
use std::fmt;
use std::io::Write;
use tracing::{debug, error, info, warn};

/// Lifecycle of an interactive session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellState {
    Starting,
    Running,
    Closing,
    Terminated,
}

/// How a session ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// Operator pressed Ctrl-C
    Interrupted,
    /// Operator input reached end of file
    InputClosed,
    /// The session died on an error
    Failed(ShellError),
}

impl SessionOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed(_))
    }

    /// Whether the remote channel should still be released
    fn wants_close(&self) -> bool {
        match self {
            SessionOutcome::Interrupted | SessionOutcome::InputClosed => true,
            SessionOutcome::Failed(e) => !e.is_transport(),
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Interrupted => write!(f, "interrupted"),
            SessionOutcome::InputClosed => write!(f, "input closed"),
            SessionOutcome::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Erase the line the local terminal echoed after the operator hit enter.
///
/// Moves up one line, skips `prompt_offset` columns and clears the rest, so
/// the remote echo does not show the command twice. The offset is fixed and
/// only right for prompts of that width.
pub fn erase_local_echo<W: Write>(out: &mut W, prompt_offset: u16) -> std::io::Result<()> {
    queue!(out, cursor::MoveUp(1))?;
    // Terminals read a zero column move as a move of one
    if prompt_offset > 0 {
        queue!(out, cursor::MoveRight(prompt_offset))?;
    }
    queue!(out, terminal::Clear(terminal::ClearType::UntilNewLine))
}

fn terminal_error(e: std::io::Error) -> ShellError {
    ShellError::Terminal(e.to_string())
}

/// Interactive loop shuttling operator lines to the tunnel and device output back
pub struct ShellLoop<L: TelemetryLink, I: LineSource, W: Write> {
    tunnel: SerialTunnel<L>,
    input: I,
    output: W,
    interrupt: Interrupt,
    settings: TerminalSettings,
    state: ShellState,
}

impl<L: TelemetryLink, I: LineSource, W: Write> ShellLoop<L, I, W> {
    pub fn new(
        tunnel: SerialTunnel<L>,
        input: I,
        output: W,
        interrupt: Interrupt,
        settings: TerminalSettings,
    ) -> Self {
        Self {
            tunnel,
            input,
            output,
            interrupt,
            settings,
            state: ShellState::Starting,
        }
    }

    pub fn state(&self) -> ShellState {
        self.state
    }

    pub fn output(&self) -> &W {
        &self.output
    }

    pub fn tunnel(&self) -> &SerialTunnel<L> {
        &self.tunnel
    }

    /// Run the session to completion
    pub async fn run(&mut self) -> SessionOutcome {
        self.state = ShellState::Starting;

        // Make sure the remote shell prints a prompt
        let result = match self.tunnel.write(b"\n").await {
            Ok(()) => {
                self.state = ShellState::Running;
                info!("Shell session running on channel {}", self.tunnel.channel());
                self.run_loop().await
            }
            Err(e) => Err(e),
        };

        let outcome = result.unwrap_or_else(SessionOutcome::Failed);
        match &outcome {
            SessionOutcome::Failed(e) => error!("Shell session failed: {}", e),
            other => info!("Shell session ended: {}", other),
        }

        if outcome.wants_close() {
            self.state = ShellState::Closing;
            if let Err(e) = self.tunnel.close().await {
                warn!("Failed to release serial control channel: {}", e);
            }
        }

        self.state = ShellState::Terminated;
        outcome
    }

    async fn run_loop(&mut self) -> ShellResult<SessionOutcome> {
        loop {
            if self.interrupt.is_triggered() {
                return Ok(SessionOutcome::Interrupted);
            }

            match self.input.poll_line(self.settings.input_poll()).await? {
                InputEvent::Line(line) => self.forward_line(line).await?,
                InputEvent::Closed => return Ok(SessionOutcome::InputClosed),
                InputEvent::Idle => {}
            }

            let data = self.tunnel.read(self.settings.read_chunk).await?;
            if !data.is_empty() {
                self.output.write_all(&data).map_err(terminal_error)?;
                self.output.flush().map_err(terminal_error)?;
            }
        }
    }

    async fn forward_line(&mut self, mut line: Vec<u8>) -> ShellResult<()> {
        debug!("forwarding {} byte command", line.len());
        erase_local_echo(&mut self.output, self.settings.prompt_offset).map_err(terminal_error)?;
        self.output.flush().map_err(terminal_error)?;

        line.push(b'\n');
        self.tunnel.write(&line).await
    }
}

use crate::domain::error::{ShellError, ShellResult};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};

/// Result of polling the operator's input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A complete line as typed, without its terminator
    Line(Vec<u8>),
    /// Nothing ready within the poll timeout
    Idle,
    /// Input reached end of file
    Closed,
}

/// Source of operator command lines
#[async_trait]
pub trait LineSource: Send {
    async fn poll_line(&mut self, timeout: Duration) -> ShellResult<InputEvent>;
}

/// Byte line reader over any buffered async input.
///
/// Lines are passed on untouched, so input that is not UTF-8 reaches the
/// device as typed.
pub struct LineReader<R> {
    reader: R,
    pending: Vec<u8>,
    eof: bool,
}

/// Line reader over the process's standard input
pub type StdinLines = LineReader<BufReader<Stdin>>;

impl<R: AsyncBufRead + Unpin + Send> LineReader<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            pending: Vec::new(),
            eof: false,
        }
    }

    fn take_line(&mut self) -> Vec<u8> {
        let mut line = std::mem::take(&mut self.pending);
        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
        }
        line
    }
}

impl StdinLines {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> LineSource for LineReader<R> {
    async fn poll_line(&mut self, timeout: Duration) -> ShellResult<InputEvent> {
        if self.eof {
            return Ok(InputEvent::Closed);
        }

        // Partial reads stay in `pending`, a timed out poll loses no input
        match tokio::time::timeout(timeout, self.reader.read_until(b'\n', &mut self.pending)).await
        {
            Err(_) => Ok(InputEvent::Idle),
            Ok(Ok(0)) => {
                self.eof = true;
                if self.pending.is_empty() {
                    Ok(InputEvent::Closed)
                } else {
                    Ok(InputEvent::Line(self.take_line()))
                }
            }
            Ok(Ok(_)) => Ok(InputEvent::Line(self.take_line())),
            Ok(Err(e)) => Err(ShellError::Terminal(format!("failed to read input: {}", e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAIT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn test_non_utf8_line_passes_through() {
        let mut input = LineReader::from_reader(&b"echo caf\xe9\nls\n"[..]);

        assert_eq!(
            input.poll_line(WAIT).await.unwrap(),
            InputEvent::Line(b"echo caf\xe9".to_vec())
        );
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Line(b"ls".to_vec()));
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Closed);
    }

    #[tokio::test]
    async fn test_crlf_and_unterminated_last_line() {
        let mut input = LineReader::from_reader(&b"top\r\nreboot"[..]);

        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Line(b"top".to_vec()));
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Line(b"reboot".to_vec()));
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Closed);
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Closed);
    }

    #[tokio::test]
    async fn test_empty_line_is_a_line() {
        let mut input = LineReader::from_reader(&b"\n"[..]);
        assert_eq!(input.poll_line(WAIT).await.unwrap(), InputEvent::Line(Vec::new()));
    }

    #[tokio::test]
    async fn test_idle_keeps_partial_input() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut input = LineReader::from_reader(BufReader::new(reader));

        tokio::io::AsyncWriteExt::write_all(&mut writer, b"pa").await.unwrap();
        assert_eq!(
            input.poll_line(Duration::from_millis(20)).await.unwrap(),
            InputEvent::Idle
        );

        tokio::io::AsyncWriteExt::write_all(&mut writer, b"ram show\n").await.unwrap();
        assert_eq!(
            input.poll_line(WAIT).await.unwrap(),
            InputEvent::Line(b"param show".to_vec())
        );
    }
}

// Core module - Tunnel and interactive shell session
pub mod input;
pub mod interrupt;
pub mod shell;
pub mod tunnel;

pub use input::{InputEvent, LineReader, LineSource, StdinLines};
pub use interrupt::Interrupt;
pub use shell::{SessionOutcome, ShellLoop, ShellState};
pub use tunnel::SerialTunnel;

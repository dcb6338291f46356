use crate::domain::config::ShellConfig;
use clap::{ArgAction, Parser};
use std::path::PathBuf;

/// Command line arguments for MavShell
#[derive(Parser, Debug)]
#[command(
    name = "mavshell",
    version = env!("CARGO_PKG_VERSION"),
    about = "Open a shell over MAVLink",
    long_about = "Interactive shell to a flight controller, tunneled over MAVLink SERIAL_CONTROL messages on a serial, UDP or TCP link."
)]
pub struct Args {
    /// MAVLink port: serial DEVICE[,BAUD], udp HOST:PORT, tcp:HOST:PORT.
    /// E.g. /dev/ttyUSB0 or 0.0.0.0:14550. Auto-detects serial if not given.
    #[arg(value_name = "PORT")]
    pub port: Option<String>,

    /// MAVLink port baud rate [default: 115200]
    #[arg(short, long)]
    pub baudrate: Option<u32>,

    /// SERIAL_CONTROL device to attach to [default: 10, the system shell]
    #[arg(long)]
    pub channel: Option<u8>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Width of the remote prompt, used to erase the local echo [default: 5]
    #[arg(long, value_name = "COLUMNS")]
    pub prompt_offset: Option<u16>,

    /// Seconds to wait for the first heartbeat [default: 10]
    #[arg(long, value_name = "SECS")]
    pub liveness_timeout: Option<u64>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Overlay the options given on the command line onto `config`
    pub fn apply_to(&self, config: &mut ShellConfig) {
        if let Some(baudrate) = self.baudrate {
            config.link.baud_rate = baudrate;
        }
        if let Some(channel) = self.channel {
            config.link.channel = channel;
        }
        if let Some(offset) = self.prompt_offset {
            config.terminal.prompt_offset = offset;
        }
        if let Some(secs) = self.liveness_timeout {
            config.link.liveness_timeout_ms = secs.saturating_mul(1000);
        }
    }
}

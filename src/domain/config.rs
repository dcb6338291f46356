use serde::{Deserialize, Serialize};
use std::time::Duration;

/// MavShell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Default log filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Telemetry link settings
    #[serde(default)]
    pub link: LinkSettings,
    /// Local terminal settings
    #[serde(default)]
    pub terminal: TerminalSettings,
    /// Serial auto-detection settings
    #[serde(default)]
    pub detect: DetectSettings,
}

/// Telemetry link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkSettings {
    /// Serial baud rate
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// SERIAL_CONTROL device addressed by the session (10 = shell)
    #[serde(default = "default_channel")]
    pub channel: u8,
    /// How long to wait for the first heartbeat
    #[serde(default = "default_liveness_timeout")]
    pub liveness_timeout_ms: u64,
    /// Bounded wait of a single receive attempt
    #[serde(default = "default_receive_timeout")]
    pub receive_timeout_ms: u64,
    /// TCP connect timeout
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Our MAVLink system id
    #[serde(default = "default_system_id")]
    pub system_id: u8,
    /// Our MAVLink component id
    #[serde(default)]
    pub component_id: u8,
}

/// Local terminal settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSettings {
    /// Poll interval for operator input
    #[serde(default = "default_input_poll")]
    pub input_poll_ms: u64,
    /// Maximum bytes requested from the tunnel per iteration
    #[serde(default = "default_read_chunk")]
    pub read_chunk: usize,
    /// Columns to skip when erasing the locally echoed line.
    ///
    /// Tuned for the 5-character `nsh> ` prompt; longer prompts leave part of
    /// the echo visible.
    #[serde(default = "default_prompt_offset")]
    pub prompt_offset: u16,
}

/// Serial auto-detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectSettings {
    /// Wildcard patterns in priority order
    #[serde(default = "default_preferred_ports")]
    pub preferred_ports: Vec<String>,
}

// Default value functions
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_channel() -> u8 {
    10
}

fn default_liveness_timeout() -> u64 {
    10_000
}

fn default_receive_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    3000
}

fn default_system_id() -> u8 {
    255
}

fn default_input_poll() -> u64 {
    1
}

fn default_read_chunk() -> usize {
    4096
}

fn default_prompt_offset() -> u16 {
    5
}

fn default_preferred_ports() -> Vec<String> {
    [
        "*FTDI*",
        "*Arduino_Mega_2560*",
        "*3D_Robotics*",
        "*USB_to_UART*",
        "*PX4*",
        "*FMU*",
    ]
    .iter()
    .map(|pattern| pattern.to_string())
    .collect()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            link: LinkSettings::default(),
            terminal: TerminalSettings::default(),
            detect: DetectSettings::default(),
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            baud_rate: default_baud_rate(),
            channel: default_channel(),
            liveness_timeout_ms: default_liveness_timeout(),
            receive_timeout_ms: default_receive_timeout(),
            connect_timeout_ms: default_connect_timeout(),
            system_id: default_system_id(),
            component_id: 0,
        }
    }
}

impl Default for TerminalSettings {
    fn default() -> Self {
        Self {
            input_poll_ms: default_input_poll(),
            read_chunk: default_read_chunk(),
            prompt_offset: default_prompt_offset(),
        }
    }
}

impl Default for DetectSettings {
    fn default() -> Self {
        Self {
            preferred_ports: default_preferred_ports(),
        }
    }
}

impl LinkSettings {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl TerminalSettings {
    pub fn input_poll(&self) -> Duration {
        Duration::from_millis(self.input_poll_ms)
    }
}

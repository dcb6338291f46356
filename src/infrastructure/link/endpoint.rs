use crate::domain::error::{ShellError, ShellResult};
use std::fmt;
use std::str::FromStr;

/// Where the telemetry link lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Serial device, optionally with a baud rate given inline as `DEVICE,BAUD`
    Serial { path: String, baud: Option<u32> },
    /// TCP client connection
    Tcp { host: String, port: u16 },
    /// Listen for UDP datagrams and answer whoever talks to us
    UdpIn { host: String, port: u16 },
    /// Send UDP datagrams to a fixed peer
    UdpOut { host: String, port: u16 },
}

impl Endpoint {
    /// Baud rate to open a serial endpoint with
    pub fn effective_baud(&self, default_baud: u32) -> u32 {
        match self {
            Endpoint::Serial { baud: Some(baud), .. } => *baud,
            _ => default_baud,
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, Endpoint::Serial { .. })
    }
}

fn split_host_port(rest: &str, input: &str) -> ShellResult<(String, u16)> {
    let (host, port) = rest
        .rsplit_once(':')
        .ok_or_else(|| ShellError::Endpoint(format!("expected HOST:PORT in '{}'", input)))?;
    if host.is_empty() {
        return Err(ShellError::Endpoint(format!("missing host in '{}'", input)));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| ShellError::Endpoint(format!("invalid port in '{}'", input)))?;
    Ok((host.to_string(), port))
}

impl FromStr for Endpoint {
    type Err = ShellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ShellError::Endpoint("empty endpoint".to_string()));
        }

        if let Some(rest) = s.strip_prefix("tcp:") {
            let (host, port) = split_host_port(rest, s)?;
            return Ok(Endpoint::Tcp { host, port });
        }
        if let Some(rest) = s.strip_prefix("udpout:") {
            let (host, port) = split_host_port(rest, s)?;
            return Ok(Endpoint::UdpOut { host, port });
        }
        if let Some(rest) = s.strip_prefix("udpin:").or_else(|| s.strip_prefix("udp:")) {
            let (host, port) = split_host_port(rest, s)?;
            return Ok(Endpoint::UdpIn { host, port });
        }

        // DEVICE,BAUD
        if let Some((path, baud)) = s.rsplit_once(',') {
            let baud = baud
                .trim()
                .parse::<u32>()
                .map_err(|_| ShellError::Endpoint(format!("invalid baud rate in '{}'", s)))?;
            return Ok(Endpoint::Serial {
                path: path.to_string(),
                baud: Some(baud),
            });
        }

        // A bare HOST:PORT is a UDP listener, anything else a device path
        let looks_like_device = s.starts_with('/') || s.starts_with('.') || s.contains('\\');
        if !looks_like_device {
            if let Some((host, port)) = s.rsplit_once(':') {
                if let (false, Ok(port)) = (host.is_empty(), port.parse::<u16>()) {
                    return Ok(Endpoint::UdpIn {
                        host: host.to_string(),
                        port,
                    });
                }
            }
        }

        Ok(Endpoint::Serial {
            path: s.to_string(),
            baud: None,
        })
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Serial { path, baud: Some(baud) } => write!(f, "{},{}", path, baud),
            Endpoint::Serial { path, baud: None } => write!(f, "{}", path),
            Endpoint::Tcp { host, port } => write!(f, "tcp:{}:{}", host, port),
            Endpoint::UdpIn { host, port } => write!(f, "udpin:{}:{}", host, port),
            Endpoint::UdpOut { host, port } => write!(f, "udpout:{}:{}", host, port),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_paths() {
        assert_eq!(
            "/dev/ttyACM0".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "/dev/ttyACM0".to_string(), baud: None }
        );
        assert_eq!(
            "COM3".parse::<Endpoint>().unwrap(),
            Endpoint::Serial { path: "COM3".to_string(), baud: None }
        );
    }

    #[test]
    fn test_serial_with_baud() {
        let endpoint: Endpoint = "/dev/ttyUSB0,57600".parse().unwrap();
        assert_eq!(endpoint.effective_baud(115200), 57600);
        assert!(endpoint.is_serial());
        assert!("/dev/ttyUSB0,fast".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_network_endpoints() {
        assert_eq!(
            "0.0.0.0:14550".parse::<Endpoint>().unwrap(),
            Endpoint::UdpIn { host: "0.0.0.0".to_string(), port: 14550 }
        );
        assert_eq!(
            "tcp:127.0.0.1:5760".parse::<Endpoint>().unwrap(),
            Endpoint::Tcp { host: "127.0.0.1".to_string(), port: 5760 }
        );
        assert_eq!(
            "udpout:192.168.1.10:14555".parse::<Endpoint>().unwrap(),
            Endpoint::UdpOut { host: "192.168.1.10".to_string(), port: 14555 }
        );
        assert!("tcp:localhost".parse::<Endpoint>().is_err());
        assert!("tcp::5760".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_network_baud_ignored() {
        let endpoint: Endpoint = "udp:0.0.0.0:14550".parse().unwrap();
        assert_eq!(endpoint.effective_baud(115200), 115200);
        assert!(!endpoint.is_serial());
    }

    #[test]
    fn test_display_roundtrip() {
        for text in ["tcp:host:1", "udpin:0.0.0.0:14550", "udpout:h:2", "/dev/ttyS0,921600"] {
            let endpoint: Endpoint = text.parse().unwrap();
            assert_eq!(endpoint.to_string(), text);
        }
    }
}

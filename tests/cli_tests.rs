use clap::Parser;
use mavshell::cli::{resolve_endpoint, Args};
use mavshell::domain::config::DetectSettings;
use mavshell::infrastructure::detect::{AutoDetector, PortCandidate, PortEnumerator};
use mavshell::{Endpoint, ShellError, ShellResult};
use std::cell::Cell;

/// Enumerator with a fixed port list that counts how often it is asked
struct FixedPorts {
    ports: Vec<PortCandidate>,
    calls: Cell<usize>,
}

impl FixedPorts {
    fn new(ports: &[(&str, &str)]) -> Self {
        Self {
            ports: ports
                .iter()
                .map(|(device, description)| PortCandidate {
                    device: device.to_string(),
                    description: description.to_string(),
                })
                .collect(),
            calls: Cell::new(0),
        }
    }
}

impl PortEnumerator for FixedPorts {
    fn ports(&self) -> ShellResult<Vec<PortCandidate>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.ports.clone())
    }
}

fn detector() -> AutoDetector {
    AutoDetector::from_settings(&DetectSettings::default())
}

/// CLI interface tests
#[cfg(test)]
mod cli_tests {
    use super::*;

    #[test]
    fn test_cli_help_mentions_port_forms() {
        let err = Args::try_parse_from(["mavshell", "--help"]).unwrap_err();
        let help = err.to_string();
        assert!(help.contains("Usage:"));
        assert!(help.contains("--baudrate"));
        assert!(help.contains("tcp:HOST:PORT"));
    }

    #[test]
    fn test_explicit_port_skips_detection() {
        let ports = FixedPorts::new(&[("/dev/ttyACM0", "PX4 FMU v5")]);
        let mut out: Vec<u8> = Vec::new();

        let endpoint =
            resolve_endpoint(Some("/dev/ttyUSB1,57600"), &detector(), &ports, &mut out).unwrap();

        assert_eq!(
            endpoint,
            Endpoint::Serial {
                path: "/dev/ttyUSB1".to_string(),
                baud: Some(57600)
            }
        );
        assert_eq!(ports.calls.get(), 0);
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_candidates_is_an_error() {
        let ports = FixedPorts::new(&[("/dev/ttyS0", "")]);
        let mut out: Vec<u8> = Vec::new();

        let err = resolve_endpoint(None, &detector(), &ports, &mut out).unwrap_err();

        assert!(matches!(err, ShellError::NoSerialPortFound));
        assert_eq!(err.to_string(), "no serial connection found");
        assert!(out.is_empty());
    }

    #[test]
    fn test_single_candidate_is_used_quietly() {
        let ports = FixedPorts::new(&[("/dev/ttyACM0", "3D Robotics PX4 FMU v2.x 0")]);
        let mut out: Vec<u8> = Vec::new();

        let endpoint = resolve_endpoint(None, &detector(), &ports, &mut out).unwrap();

        assert_eq!(
            endpoint,
            Endpoint::Serial {
                path: "/dev/ttyACM0".to_string(),
                baud: None
            }
        );
        let printed = String::from_utf8(out).unwrap();
        assert!(!printed.contains("Auto-detected"));
        assert!(printed.contains("Using port /dev/ttyACM0"));
    }

    #[test]
    fn test_multiple_candidates_are_listed() {
        let ports = FixedPorts::new(&[
            ("/dev/ttyACM0", "PX4 FMU v5"),
            ("/dev/ttyUSB0", "FTDI FT232R USB UART"),
        ]);
        let mut out: Vec<u8> = Vec::new();

        let endpoint = resolve_endpoint(None, &detector(), &ports, &mut out).unwrap();

        assert!(matches!(endpoint, Endpoint::Serial { ref path, .. } if path == "/dev/ttyUSB0"));
        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines[0], "Auto-detected serial ports are:");
        assert_eq!(lines.len(), 4);
        assert!(lines[3].starts_with("Using port /dev/ttyUSB0"));
    }

    #[test]
    fn test_bad_port_is_endpoint_error() {
        let ports = FixedPorts::new(&[]);
        let err = resolve_endpoint(Some("tcp:localhost"), &detector(), &ports, &mut Vec::<u8>::new())
            .unwrap_err();
        assert!(matches!(err, ShellError::Endpoint(_)));
    }
}

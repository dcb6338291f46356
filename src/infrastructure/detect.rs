// Detect module - Serial port auto-detection by preferred name patterns
use crate::domain::config::DetectSettings;
use crate::domain::error::ShellResult;
use serialport::{SerialPortInfo, SerialPortType};
use std::fmt;
use tracing::debug;

/// A serial port that could carry the telemetry link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidate {
    /// Path or name to open
    pub device: String,
    /// USB manufacturer/product/serial, empty for non-USB ports
    pub description: String,
}

impl From<&SerialPortInfo> for PortCandidate {
    fn from(info: &SerialPortInfo) -> Self {
        let description = match &info.port_type {
            SerialPortType::UsbPort(usb) => [&usb.manufacturer, &usb.product, &usb.serial_number]
                .iter()
                .filter_map(|field| field.as_deref())
                .collect::<Vec<_>>()
                .join(" "),
            _ => String::new(),
        };

        Self {
            device: info.port_name.clone(),
            description,
        }
    }
}

impl fmt::Display for PortCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.device)
        } else {
            write!(f, "{} - {}", self.device, self.description)
        }
    }
}

/// Source of serial ports to choose from
pub trait PortEnumerator {
    fn ports(&self) -> ShellResult<Vec<PortCandidate>>;
}

/// Ports reported by the operating system
pub struct SystemPorts;

impl PortEnumerator for SystemPorts {
    fn ports(&self) -> ShellResult<Vec<PortCandidate>> {
        let ports = serialport::available_ports()?;
        Ok(ports.iter().map(PortCandidate::from).collect())
    }
}

/// Glob-style match supporting `*` and `?`
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star, mark)) = backtrack {
            // Let the last star swallow one more character
            p = star + 1;
            t = mark + 1;
            backtrack = Some((star, mark + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|c| *c == '*')
}

/// Picks likely flight controller ports, best pattern first
#[derive(Debug, Clone)]
pub struct AutoDetector {
    patterns: Vec<String>,
}

impl AutoDetector {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn from_settings(settings: &DetectSettings) -> Self {
        Self::new(settings.preferred_ports.clone())
    }

    /// Index of the first pattern matching the port, if any
    fn rank(&self, port: &PortCandidate) -> Option<usize> {
        let underscored = port.description.replace(' ', "_");
        let haystacks = [port.device.as_str(), port.description.as_str(), underscored.as_str()];

        self.patterns.iter().position(|pattern| {
            haystacks
                .iter()
                .any(|text| !text.is_empty() && wildcard_match(pattern, text))
        })
    }

    /// Matching ports ordered by pattern priority, enumeration order within a pattern
    pub fn detect(&self, enumerator: &dyn PortEnumerator) -> ShellResult<Vec<PortCandidate>> {
        let ports = enumerator.ports()?;
        debug!("Enumerated {} serial ports", ports.len());

        let mut ranked: Vec<(usize, PortCandidate)> = ports
            .into_iter()
            .filter_map(|port| self.rank(&port).map(|rank| (rank, port)))
            .collect();
        ranked.sort_by_key(|(rank, _)| *rank);

        Ok(ranked.into_iter().map(|(_, port)| port).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::ShellError;

    struct FixedPorts(Vec<PortCandidate>);

    impl PortEnumerator for FixedPorts {
        fn ports(&self) -> ShellResult<Vec<PortCandidate>> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPorts;

    impl PortEnumerator for BrokenPorts {
        fn ports(&self) -> ShellResult<Vec<PortCandidate>> {
            Err(ShellError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "udev unavailable",
            )))
        }
    }

    fn port(device: &str, description: &str) -> PortCandidate {
        PortCandidate {
            device: device.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn test_wildcard_match() {
        assert!(wildcard_match("*PX4*", "PX4 FMU v5"));
        assert!(wildcard_match("*FMU*", "/dev/serial/by-id/usb-3D_Robotics_PX4_FMU_v2.x_0-if00"));
        assert!(wildcard_match("/dev/ttyACM?", "/dev/ttyACM0"));
        assert!(wildcard_match("*", ""));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("*FTDI*", "Silicon Labs CP2102"));
        assert!(!wildcard_match("/dev/ttyACM?", "/dev/ttyACM10"));
        assert!(!wildcard_match("*px4*", "PX4"));
    }

    #[test]
    fn test_detect_orders_by_pattern_priority() {
        let detector = AutoDetector::from_settings(&DetectSettings::default());
        let ports = FixedPorts(vec![
            port("/dev/ttyS0", ""),
            port("/dev/ttyACM0", "3D Robotics PX4 FMU v2.x 0"),
            port("/dev/ttyUSB0", "FTDI FT232R USB UART A50285BI"),
        ]);

        let found = detector.detect(&ports).unwrap();
        let devices: Vec<&str> = found.iter().map(|p| p.device.as_str()).collect();
        assert_eq!(devices, vec!["/dev/ttyUSB0", "/dev/ttyACM0"]);
    }

    #[test]
    fn test_detect_nothing() {
        let detector = AutoDetector::from_settings(&DetectSettings::default());
        let ports = FixedPorts(vec![port("/dev/ttyS0", ""), port("/dev/ttyS1", "")]);
        assert!(detector.detect(&ports).unwrap().is_empty());
        assert!(detector.detect(&FixedPorts(Vec::new())).unwrap().is_empty());
    }

    #[test]
    fn test_enumeration_error_propagates() {
        let detector = AutoDetector::new(vec!["*".to_string()]);
        assert!(detector.detect(&BrokenPorts).is_err());
    }

    #[test]
    fn test_candidate_display() {
        assert_eq!(port("/dev/ttyS0", "").to_string(), "/dev/ttyS0");
        assert_eq!(port("COM4", "PX4 FMU").to_string(), "COM4 - PX4 FMU");
    }
}

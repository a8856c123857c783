use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A PCI bus address in `DDDD:BB:DD.F` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PciBusId {
    pub domain: u16,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

#[derive(Debug, Error)]
#[error("invalid PCI bus ID '{0}', expected DDDD:BB:DD.F")]
pub struct PciBusIdParseError(String);

impl FromStr for PciBusId {
    type Err = PciBusIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_strict(s).ok_or_else(|| PciBusIdParseError(s.to_string()))
    }
}

/// Strict, readable reimplementation: `DDDD:BB:DD.F`.
fn parse_strict(s: &str) -> Option<PciBusId> {
    let (domain, rest) = s.split_once(':')?;
    let (bus, rest) = rest.split_once(':')?;
    let (device, function) = rest.split_once('.')?;

    Some(PciBusId {
        domain: u16::from_str_radix(domain, 16).ok()?,
        bus: u8::from_str_radix(bus, 16).ok()?,
        device: u8::from_str_radix(device, 16).ok()?,
        function: u8::from_str_radix(function, 16).ok()?,
    })
}

impl fmt::Display for PciBusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04x}:{:02x}:{:02x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}

impl PciBusId {
    pub fn resource_path(&self, bar: u32) -> String {
        format!(
            "/sys/bus/pci/devices/{}/resource{}",
            self, bar
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_bus_id() {
        let id: PciBusId = "0000:1f:00.1".parse().unwrap();
        assert_eq!(id.domain, 0);
        assert_eq!(id.bus, 0x1f);
        assert_eq!(id.device, 0);
        assert_eq!(id.function, 1);
    }

    #[test]
    fn round_trips_through_display() {
        let id: PciBusId = "0001:3a:05.0".parse().unwrap();
        assert_eq!(id.to_string(), "0001:3a:05.0");
    }

    #[test]
    fn rejects_malformed_input() {
        assert!("not-a-bus-id".parse::<PciBusId>().is_err());
        assert!("0000:1f:00".parse::<PciBusId>().is_err());
    }

    #[test]
    fn resource_path_matches_sysfs_convention() {
        let id: PciBusId = "0000:1f:00.1".parse().unwrap();
        assert_eq!(
            id.resource_path(2),
            "/sys/bus/pci/devices/0000:1f:00.1/resource2"
        );
    }
}

//! Port configuration bundle.
//!
//! Holds the parameters a serial port is configured with. The loopback
//! channel only acts on the baud rate and the two timeouts; the framing
//! fields are stored and reported back so callers written against a real
//! port see consistent values.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Conventional baud rates, lowest to highest.
pub const STANDARD_BAUD_RATES: [u32; 17] = [
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200,
];

/// Default baud rate for a freshly constructed channel.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Bits on the wire per byte: 8 data bits plus start and stop framing.
pub const BITS_PER_BYTE: f64 = 10.0;

/// Check that a baud rate lies in (0, 2^32).
///
/// Takes a `u64` so values decoded from wider sources (config files, CLI
/// flags) can be rejected instead of silently truncated.
pub fn validate_baud_rate(baud_rate: u64) -> Result<u32, PortError> {
    match u32::try_from(baud_rate) {
        Ok(rate) if rate > 0 => Ok(rate),
        _ => Err(PortError::InvalidBaudRate(baud_rate)),
    }
}

/// Configuration parameters for a serial port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortSettings {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// Read timeout. `None` blocks until the requested bytes arrive.
    pub read_timeout: Option<Duration>,

    /// Write timeout. `None` waits indefinitely for queue space.
    pub write_timeout: Option<Duration>,
}

impl Default for PortSettings {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            read_timeout: None,
            write_timeout: None,
        }
    }
}

impl PortSettings {
    /// Approximate time the given number of bytes would take on a real wire.
    pub fn transmit_duration(&self, len: usize) -> Duration {
        Duration::from_secs_f64(BITS_PER_BYTE * len as f64 / f64::from(self.baud_rate))
    }

    /// Whether the configured baud rate is one of [`STANDARD_BAUD_RATES`].
    pub fn is_standard_baud_rate(&self) -> bool {
        STANDARD_BAUD_RATES.contains(&self.baud_rate)
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

impl From<serialport::DataBits> for DataBits {
    fn from(bits: serialport::DataBits) -> Self {
        match bits {
            serialport::DataBits::Five => DataBits::Five,
            serialport::DataBits::Six => DataBits::Six,
            serialport::DataBits::Seven => DataBits::Seven,
            serialport::DataBits::Eight => DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

impl From<serialport::FlowControl> for FlowControl {
    fn from(flow: serialport::FlowControl) -> Self {
        match flow {
            serialport::FlowControl::None => FlowControl::None,
            serialport::FlowControl::Software => FlowControl::Software,
            serialport::FlowControl::Hardware => FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

impl From<serialport::Parity> for Parity {
    fn from(parity: serialport::Parity) -> Self {
        match parity {
            serialport::Parity::None => Parity::None,
            serialport::Parity::Odd => Parity::Odd,
            serialport::Parity::Even => Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

impl From<serialport::StopBits> for StopBits {
    fn from(bits: serialport::StopBits) -> Self {
        match bits {
            serialport::StopBits::One => StopBits::One,
            serialport::StopBits::Two => StopBits::Two,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = PortSettings::default();
        assert_eq!(settings.baud_rate, 9600);
        assert_eq!(settings.data_bits, DataBits::Eight);
        assert_eq!(settings.flow_control, FlowControl::None);
        assert_eq!(settings.parity, Parity::None);
        assert_eq!(settings.stop_bits, StopBits::One);
        assert_eq!(settings.read_timeout, None);
        assert_eq!(settings.write_timeout, None);
        assert!(settings.is_standard_baud_rate());
    }

    #[test]
    fn test_validate_baud_rate_bounds() {
        assert!(matches!(validate_baud_rate(0), Err(PortError::InvalidBaudRate(0))));
        assert_eq!(validate_baud_rate(1).unwrap(), 1);
        assert_eq!(validate_baud_rate(u64::from(u32::MAX)).unwrap(), u32::MAX);
        assert!(matches!(
            validate_baud_rate(1 << 32),
            Err(PortError::InvalidBaudRate(v)) if v == 1 << 32
        ));
    }

    #[test]
    fn test_transmit_duration() {
        let settings = PortSettings {
            baud_rate: 1000,
            ..Default::default()
        };
        // 10 bits per byte at 1000 baud: 10 ms per byte.
        assert_eq!(settings.transmit_duration(5), Duration::from_millis(50));
        assert_eq!(settings.transmit_duration(0), Duration::ZERO);
    }

    #[test]
    fn test_non_standard_baud_rate() {
        let settings = PortSettings {
            baud_rate: 12345,
            ..Default::default()
        };
        assert!(!settings.is_standard_baud_rate());
    }

    #[test]
    fn test_serialport_conversions() {
        let bits: serialport::DataBits = DataBits::Seven.into();
        assert_eq!(bits, serialport::DataBits::Seven);
        assert_eq!(DataBits::from(bits), DataBits::Seven);

        let flow: serialport::FlowControl = FlowControl::Hardware.into();
        assert_eq!(FlowControl::from(flow), FlowControl::Hardware);

        let parity: serialport::Parity = Parity::Even.into();
        assert_eq!(Parity::from(parity), Parity::Even);

        let stop: serialport::StopBits = StopBits::Two.into();
        assert_eq!(StopBits::from(stop), StopBits::Two);
    }
}

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Result, TransportError};

/// Default time a blocking read waits for the first byte before giving up.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Flow control mode of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowControl {
    #[default]
    None,
    Hardware,
    Software,
}

/// Parity mode of the serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Parity {
    #[default]
    None,
    Odd,
    Even,
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    #[default]
    One,
    OnePointFive,
    Two,
}

impl FromStr for FlowControl {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(FlowControl::None),
            "hardware" => Ok(FlowControl::Hardware),
            "software" => Ok(FlowControl::Software),
            other => Err(TransportError::InvalidConfig(format!(
                "flow_control must be one of: none, hardware, software (got {other:?})"
            ))),
        }
    }
}

impl FromStr for Parity {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            other => Err(TransportError::InvalidConfig(format!(
                "parity must be one of: none, odd, even (got {other:?})"
            ))),
        }
    }
}

impl FromStr for StopBits {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1" | "1.0" => Ok(StopBits::One),
            "1.5" => Ok(StopBits::OnePointFive),
            "2" | "2.0" => Ok(StopBits::Two),
            other => Err(TransportError::InvalidConfig(format!(
                "stop_bits must be one of: 1, 1.5, 2 (got {other:?})"
            ))),
        }
    }
}

impl fmt::Display for FlowControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlowControl::None => "none",
            FlowControl::Hardware => "hardware",
            FlowControl::Software => "software",
        })
    }
}

impl fmt::Display for Parity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
        })
    }
}

impl fmt::Display for StopBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopBits::One => "1",
            StopBits::OnePointFive => "1.5",
            StopBits::Two => "2",
        })
    }
}

/// Serial port settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or port name (e.g. `/dev/ttyACM0`, `COM3`).
    pub port: String,
    /// Line speed in baud. Must be positive.
    pub baud_rate: u32,
    pub flow_control: FlowControl,
    pub parity: Parity,
    pub stop_bits: StopBits,
    /// How long a read blocks waiting for data.
    pub read_timeout: Duration,
}

impl SerialConfig {
    /// Settings for `port` at `baud_rate`, 8N1 without flow control.
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            port: port.into(),
            baud_rate,
            flow_control: FlowControl::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Reject settings that can never open a port.
    pub fn validate(&self) -> Result<()> {
        if self.port.trim().is_empty() {
            return Err(TransportError::InvalidConfig(
                "port must not be empty".to_string(),
            ));
        }
        if self.baud_rate == 0 {
            return Err(TransportError::InvalidConfig(
                "baud_rate must be greater than zero".to_string(),
            ));
        }
        if self.read_timeout.is_zero() {
            return Err(TransportError::InvalidConfig(
                "read_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

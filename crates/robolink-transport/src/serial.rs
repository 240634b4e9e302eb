use std::io::{Read, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serialport::{SerialPort, SerialPortBuilder, SerialPortType};
use tracing::{debug, info};

use crate::config::{FlowControl, Parity, SerialConfig, StopBits};
use crate::error::{Result, TransportError};
use crate::traits::Transport;

type PortSlot = Mutex<Option<Box<dyn SerialPort>>>;

/// Serial port transport.
///
/// The port is opened once and cloned into two handles: one used only for
/// reads, one only for writes, each behind its own lock. The receive loop can
/// sit in a blocking read while the send loop writes. `open` and `close`
/// take both locks (writer first, then reader) so a reopen never interleaves
/// with a read or write in progress.
pub struct SerialTransport {
    config: SerialConfig,
    reader: PortSlot,
    writer: PortSlot,
}

impl SerialTransport {
    /// Validate `config` and build a closed transport.
    ///
    /// Settings the backend cannot express (1.5 stop bits) are rejected here,
    /// at startup, rather than on every reconnect attempt.
    pub fn new(config: SerialConfig) -> Result<Self> {
        config.validate()?;
        backend_stop_bits(config.stop_bits)?;
        Ok(Self {
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        })
    }

    /// The settings this transport opens with.
    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    fn builder(&self) -> Result<SerialPortBuilder> {
        Ok(serialport::new(&self.config.port, self.config.baud_rate)
            .flow_control(backend_flow_control(self.config.flow_control))
            .parity(backend_parity(self.config.parity))
            .stop_bits(backend_stop_bits(self.config.stop_bits)?)
            .timeout(self.config.read_timeout))
    }

    fn open_error(&self, source: serialport::Error) -> TransportError {
        TransportError::Open {
            port: self.config.port.clone(),
            source,
        }
    }
}

impl Transport for SerialTransport {
    fn open(&self) -> Result<()> {
        let port = self.builder()?.open().map_err(|e| self.open_error(e))?;
        let read_half = port.try_clone().map_err(|e| self.open_error(e))?;

        let mut writer = lock(&self.writer);
        let mut reader = lock(&self.reader);
        *writer = Some(port);
        *reader = Some(read_half);

        info!(
            port = %self.config.port,
            baud = self.config.baud_rate,
            "serial port opened"
        );
        Ok(())
    }

    fn close(&self) {
        let mut writer = lock(&self.writer);
        let mut reader = lock(&self.reader);
        let was_open = writer.take().is_some() | reader.take().is_some();
        if was_open {
            debug!(port = %self.config.port, "serial port closed");
        }
    }

    fn is_open(&self) -> bool {
        lock(&self.writer).is_some()
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = lock(&self.reader);
        let port = guard.as_mut().ok_or(TransportError::NotOpen)?;
        Ok(port.read(buf)?)
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut guard = lock(&self.writer);
        let port = guard.as_mut().ok_or(TransportError::NotOpen)?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.config.port
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("config", &self.config)
            .field("open", &self.is_open())
            .finish()
    }
}

fn lock<T>(slot: &Mutex<T>) -> MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

fn backend_flow_control(value: FlowControl) -> serialport::FlowControl {
    match value {
        FlowControl::None => serialport::FlowControl::None,
        FlowControl::Hardware => serialport::FlowControl::Hardware,
        FlowControl::Software => serialport::FlowControl::Software,
    }
}

fn backend_parity(value: Parity) -> serialport::Parity {
    match value {
        Parity::None => serialport::Parity::None,
        Parity::Odd => serialport::Parity::Odd,
        Parity::Even => serialport::Parity::Even,
    }
}

fn backend_stop_bits(value: StopBits) -> Result<serialport::StopBits> {
    match value {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(TransportError::Unsupported(
            "1.5 stop bits are not supported by the serial backend".to_string(),
        )),
    }
}

/// A serial port visible to the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSummary {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// Enumerate serial ports.
pub fn list_ports() -> Result<Vec<PortSummary>> {
    let ports = serialport::available_ports()
        .map_err(|err| TransportError::Io(std::io::Error::from(err)))?;

    Ok(ports
        .into_iter()
        .map(|info| {
            let (kind, description) = match info.port_type {
                SerialPortType::UsbPort(usb) => {
                    let product = usb.product.unwrap_or_default();
                    let detail = format!("{:04x}:{:04x} {}", usb.vid, usb.pid, product);
                    ("usb", Some(detail.trim_end().to_string()))
                }
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortSummary {
                name: info.port_name,
                kind,
                description,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_one_and_a_half_stop_bits_at_construction() {
        let mut config = SerialConfig::new("/dev/ttyACM0", 921_600);
        config.stop_bits = StopBits::OnePointFive;

        let err = SerialTransport::new(config).unwrap_err();
        assert!(matches!(err, TransportError::Unsupported(_)));
    }

    #[test]
    fn rejects_invalid_config_at_construction() {
        let err = SerialTransport::new(SerialConfig::new("", 921_600)).unwrap_err();
        assert!(matches!(err, TransportError::InvalidConfig(_)));
    }

    #[test]
    fn starts_closed_and_refuses_io() {
        let transport =
            SerialTransport::new(SerialConfig::new("/dev/robolink-test-port", 115_200)).unwrap();
        assert!(!transport.is_open());

        let mut buf = [0u8; 4];
        assert!(matches!(
            transport.read(&mut buf),
            Err(TransportError::NotOpen)
        ));
        assert!(matches!(
            transport.write(b"x"),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    #[cfg(unix)]
    fn open_missing_device_reports_port_name() {
        let transport = SerialTransport::new(SerialConfig::new(
            "/dev/robolink-missing-device",
            115_200,
        ))
        .unwrap();

        let err = transport.open().unwrap_err();
        match err {
            TransportError::Open { port, .. } => assert_eq!(port, "/dev/robolink-missing-device"),
            other => panic!("expected open error, got {other:?}"),
        }
        assert!(!transport.is_open());
    }

    #[test]
    fn close_is_idempotent() {
        let transport =
            SerialTransport::new(SerialConfig::new("/dev/robolink-test-port", 115_200)).unwrap();
        transport.close();
        transport.close();
        assert!(!transport.is_open());
    }
}

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use robolink_link::BridgeConfig;
use robolink_transport::{FlowControl, Parity, SerialConfig, StopBits};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod decode;
pub mod ports;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bridge a serial port: print telemetry, send commands read from stdin.
    Run(RunArgs),
    /// Decode a raw capture of controller output.
    Decode(DecodeArgs),
    /// List serial ports.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct SerialArgs {
    /// Serial device (e.g. /dev/ttyACM0, COM3).
    #[arg(long, env = "ROBOLINK_PORT")]
    pub port: String,
    /// Line speed in baud.
    #[arg(long, env = "ROBOLINK_BAUD")]
    pub baud: u32,
    /// Flow control: none, hardware, software.
    #[arg(long, env = "ROBOLINK_FLOW_CONTROL", default_value = "none")]
    pub flow_control: FlowControl,
    /// Parity: none, odd, even.
    #[arg(long, env = "ROBOLINK_PARITY", default_value = "none")]
    pub parity: Parity,
    /// Stop bits: 1, 1.5, 2.
    #[arg(long, env = "ROBOLINK_STOP_BITS", default_value = "1")]
    pub stop_bits: StopBits,
    /// How long a read waits for data (e.g. 100ms, 1s).
    #[arg(long, default_value = "100ms")]
    pub read_timeout: String,
}

impl SerialArgs {
    pub fn to_config(&self) -> CliResult<SerialConfig> {
        Ok(SerialConfig {
            flow_control: self.flow_control,
            parity: self.parity,
            stop_bits: self.stop_bits,
            read_timeout: parse_duration(&self.read_timeout)?,
            ..SerialConfig::new(self.port.clone(), self.baud)
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub serial: SerialArgs,
    /// Delay between reopen attempts while the link is down.
    #[arg(long, default_value = "1s")]
    pub reconnect_interval: String,
    /// Pause of the receive and send loops while the link is down.
    #[arg(long, default_value = "1s")]
    pub backoff: String,
    /// Period of the outbound command record.
    #[arg(long, default_value = "5ms")]
    pub send_period: String,
    /// Do not read command updates from stdin.
    #[arg(long)]
    pub no_stdin: bool,
}

impl RunArgs {
    pub fn bridge_config(&self) -> CliResult<BridgeConfig> {
        Ok(BridgeConfig {
            reconnect_interval: parse_duration(&self.reconnect_interval)?,
            backoff: parse_duration(&self.backoff)?,
            send_period: parse_duration(&self.send_period)?,
        })
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Capture file, or `-` for stdin.
    pub input: PathBuf,
    /// Print the summary only.
    #[arg(long)]
    pub summary_only: bool,
}

#[derive(Args, Debug)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended version information.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `150ms`, `2s` or bare seconds. Zero is rejected.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("5ms").unwrap(), Duration::from_millis(5));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert_eq!(parse_duration("0ms").unwrap_err().code, USAGE);
        assert_eq!(parse_duration("bad").unwrap_err().code, USAGE);
        assert_eq!(parse_duration(" ").unwrap_err().code, USAGE);
    }

    #[test]
    fn serial_args_build_config() {
        let args = SerialArgs {
            port: "/dev/ttyACM0".to_string(),
            baud: 115_200,
            flow_control: FlowControl::Hardware,
            parity: Parity::Even,
            stop_bits: StopBits::Two,
            read_timeout: "250ms".to_string(),
        };

        let config = args.to_config().unwrap();
        assert_eq!(config.port, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.flow_control, FlowControl::Hardware);
        assert_eq!(config.parity, Parity::Even);
        assert_eq!(config.stop_bits, StopBits::Two);
        assert_eq!(config.read_timeout, Duration::from_millis(250));
    }
}

mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "robolink",
    version,
    about = "Serial bridge to an embedded robot controller"
)]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use robolink_transport::{FlowControl, StopBits};

    use super::*;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "robolink",
            "run",
            "--port",
            "/dev/ttyACM0",
            "--baud",
            "921600",
            "--flow-control",
            "hardware",
            "--stop-bits",
            "2",
        ])
        .expect("run args should parse");

        let Command::Run(args) = cli.command else {
            panic!("expected run subcommand");
        };
        assert_eq!(args.serial.baud, 921_600);
        assert_eq!(args.serial.flow_control, FlowControl::Hardware);
        assert_eq!(args.serial.stop_bits, StopBits::Two);
        assert_eq!(args.send_period, "5ms");
    }

    #[test]
    fn run_requires_baud() {
        let err = Cli::try_parse_from(["robolink", "run", "--port", "/dev/null"])
            .expect_err("missing baud should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_unknown_parity() {
        let err = Cli::try_parse_from([
            "robolink", "run", "--port", "/dev/null", "--baud", "9600", "--parity", "mark",
        ])
        .expect_err("unknown parity should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }

    #[test]
    fn global_format_after_subcommand() {
        let cli = Cli::try_parse_from(["robolink", "decode", "capture.bin", "--format", "json"])
            .expect("decode args should parse");
        assert_eq!(cli.format, Some(OutputFormat::Json));
        assert!(matches!(cli.command, Command::Decode(_)));
    }
}

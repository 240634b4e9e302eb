use std::fs::File;
use std::io::{self, Cursor, Read};

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use robolink_frame::{FrameError, FrameReader, ReaderStats, Telemetry};
use robolink_link::{dispatch, TelemetrySink};
use serde::Serialize;
use tracing::{info, warn};

use crate::cmd::DecodeArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{OutputFormat, OutputSink};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
struct DecodeSummary {
    frames: u64,
    unknown: u64,
    malformed: u64,
    skipped_bytes: u64,
    header_errors: u64,
    packet_errors: u64,
    oversized: u64,
    truncated: u64,
}

impl DecodeSummary {
    fn with_stats(mut self, stats: ReaderStats) -> Self {
        self.frames = stats.frames;
        self.skipped_bytes = stats.skipped_bytes;
        self.header_errors = stats.header_errors;
        self.packet_errors = stats.packet_errors;
        self.oversized = stats.oversized;
        self.truncated = stats.truncated;
        self
    }

    fn rows(&self) -> [(&'static str, u64); 8] {
        [
            ("frames", self.frames),
            ("unknown", self.unknown),
            ("malformed", self.malformed),
            ("skipped_bytes", self.skipped_bytes),
            ("header_errors", self.header_errors),
            ("packet_errors", self.packet_errors),
            ("oversized", self.oversized),
            ("truncated", self.truncated),
        ]
    }
}

#[derive(Serialize)]
struct SummaryOutput {
    kind: &'static str,
    #[serde(flatten)]
    summary: DecodeSummary,
}

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let capture = read_input(&args)?;
    let summary = if args.summary_only {
        decode_capture(capture, &mut NullSink)?
    } else {
        decode_capture(capture, &mut OutputSink::stdout(format))?
    };

    print_summary(&summary, format);
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    let mut capture = Vec::new();
    let result = if args.input.as_os_str() == "-" {
        io::stdin().lock().read_to_end(&mut capture)
    } else {
        let context = format!("cannot open {}", args.input.display());
        File::open(&args.input)
            .map_err(|err| io_error(&context, err))?
            .read_to_end(&mut capture)
    };
    result.map_err(|err| io_error("read failed", err))?;
    Ok(capture)
}

/// Decode every frame of a capture into `sink`.
///
/// Framing errors are counted and skipped; the capture ends at EOF.
fn decode_capture<S: TelemetrySink + ?Sized>(
    capture: Vec<u8>,
    sink: &mut S,
) -> CliResult<DecodeSummary> {
    let mut reader = FrameReader::new(Cursor::new(capture));
    let mut summary = DecodeSummary::default();

    loop {
        let frame = match reader.read_frame() {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) if err.is_io() => return Err(frame_error("read failed", err)),
            Err(err) => {
                warn!(error = %err, "discarding frame");
                continue;
            }
        };

        let Some(kind) = frame.kind() else {
            info!(id = frame.message_id(), "unknown message id");
            summary.unknown += 1;
            continue;
        };

        match Telemetry::decode(kind, &frame.payload) {
            Ok(record) => dispatch(sink, &record),
            Err(err) => {
                warn!(kind = kind.name(), error = %err, "discarding payload");
                summary.malformed += 1;
            }
        }
    }

    Ok(summary.with_stats(reader.stats()))
}

fn print_summary(summary: &DecodeSummary, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SummaryOutput {
                kind: "summary",
                summary: *summary,
            };
            if let Ok(line) = serde_json::to_string(&out) {
                println!("{line}");
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SUMMARY", "COUNT"]);
            for (name, count) in summary.rows() {
                table.add_row(vec![name.to_string(), count.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let fields: Vec<String> = summary
                .rows()
                .iter()
                .map(|(name, count)| format!("{name}={count}"))
                .collect();
            println!("summary {}", fields.join(" "));
        }
    }
}

struct NullSink;

impl TelemetrySink for NullSink {}

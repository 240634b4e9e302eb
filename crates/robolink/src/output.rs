use std::collections::BTreeSet;
use std::io::{ErrorKind, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use robolink_frame::messages::{
    AllRobotHp, DebugData, EventData, GameStatus, GimbalCmd, GroundRobotPosition, ImuData,
    RfidStatus, RobotMotion, RobotStatus, ShootCmd,
};
use robolink_frame::Telemetry;
use robolink_link::TelemetrySink;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput<'a> {
    received_at: String,
    #[serde(flatten)]
    record: &'a Telemetry,
}

#[derive(Serialize)]
struct DebugValueOutput<'a> {
    received_at: String,
    kind: &'static str,
    name: &'a str,
    value: f32,
}

/// Prints every decoded record to `out`.
///
/// Debug packets are flattened into one line per named value; the first time
/// a name appears it is announced in the log, the way a publisher per name
/// would be created on demand.
///
/// After the first failed write nothing more is written. A closed pipe also
/// clears the `running` flag, if one was given.
pub struct OutputSink<W> {
    out: W,
    format: OutputFormat,
    debug_names: BTreeSet<String>,
    records: u64,
    write_failed: bool,
    running: Option<Arc<AtomicBool>>,
}

impl OutputSink<std::io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write + Send> OutputSink<W> {
    pub fn new(out: W, format: OutputFormat) -> Self {
        Self {
            out,
            format,
            debug_names: BTreeSet::new(),
            records: 0,
            write_failed: false,
            running: None,
        }
    }

    /// Clear `running` when the reader of `out` goes away.
    pub fn with_running(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = Some(running);
        self
    }

    pub fn write_failed(&self) -> bool {
        self.write_failed
    }

    /// Debug value names seen so far.
    pub fn debug_names(&self) -> &BTreeSet<String> {
        &self.debug_names
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn print(&mut self, record: &Telemetry) {
        self.records += 1;
        if self.write_failed {
            return;
        }
        let line = match self.format {
            OutputFormat::Json => {
                let out = RecordOutput {
                    received_at: now_unix_millis(),
                    record,
                };
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => record_table(record),
            OutputFormat::Pretty => record_pretty(record),
        };
        self.emit(&line);
    }

    fn print_debug_value(&mut self, name: &str, value: f32) {
        if !self.debug_names.contains(name) {
            info!(name, "new debug channel");
            self.debug_names.insert(name.to_string());
        }

        self.records += 1;
        if self.write_failed {
            return;
        }
        let line = match self.format {
            OutputFormat::Json => {
                let out = DebugValueOutput {
                    received_at: now_unix_millis(),
                    kind: "debug_value",
                    name,
                    value,
                };
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["DEBUG", "VALUE"])
                    .add_row(vec![name.to_string(), value.to_string()]);
                table.to_string()
            }
            OutputFormat::Pretty => format!("debug {name}={value}"),
        };
        self.emit(&line);
    }

    fn emit(&mut self, line: &str) {
        if let Err(err) = writeln!(self.out, "{line}") {
            self.write_failed = true;
            warn!(error = %err, "output write failed, dropping further records");
            if err.kind() == ErrorKind::BrokenPipe {
                if let Some(running) = &self.running {
                    running.store(false, Ordering::SeqCst);
                }
            }
        }
    }
}

impl<W: Write + Send> TelemetrySink for OutputSink<W> {
    fn on_debug(&mut self, data: &DebugData) {
        for (name, value) in data.values() {
            self.print_debug_value(&name, value);
        }
    }

    fn on_imu(&mut self, imu: &ImuData) {
        self.print(&Telemetry::Imu(*imu));
    }

    fn on_event_data(&mut self, event: &EventData) {
        self.print(&Telemetry::EventData(*event));
    }

    fn on_all_robot_hp(&mut self, hp: &AllRobotHp) {
        self.print(&Telemetry::AllRobotHp(*hp));
    }

    fn on_game_status(&mut self, status: &GameStatus) {
        self.print(&Telemetry::GameStatus(*status));
    }

    fn on_robot_motion(&mut self, motion: &RobotMotion) {
        self.print(&Telemetry::RobotMotion(*motion));
    }

    fn on_ground_robot_position(&mut self, position: &GroundRobotPosition) {
        self.print(&Telemetry::GroundRobotPosition(*position));
    }

    fn on_rfid_status(&mut self, rfid: &RfidStatus) {
        self.print(&Telemetry::RfidStatus(*rfid));
    }

    fn on_robot_status(&mut self, status: &RobotStatus) {
        self.print(&Telemetry::RobotStatus(*status));
    }

    fn on_gimbal_cmd(&mut self, cmd: &GimbalCmd) {
        self.print(&Telemetry::GimbalCmd(*cmd));
    }

    fn on_shoot_cmd(&mut self, cmd: &ShootCmd) {
        self.print(&Telemetry::ShootCmd(*cmd));
    }
}

/// Flatten a record into `(field, value)` pairs, nested fields dotted.
fn record_fields(record: &Telemetry) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if let Ok(Value::Object(map)) = serde_json::to_value(record) {
        flatten_into("", &map, &mut fields);
    }
    fields
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, fields: &mut Vec<(String, String)>) {
    for (key, value) in map {
        if prefix.is_empty() && key == "kind" {
            continue;
        }
        let name = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Object(inner) => flatten_into(&name, inner, fields),
            Value::String(text) => fields.push((name, text.clone())),
            other => fields.push((name, other.to_string())),
        }
    }
}

fn record_table(record: &Telemetry) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![record.kind().name().to_uppercase(), "VALUE".to_string()]);
    for (name, value) in record_fields(record) {
        table.add_row(vec![name, value]);
    }
    table.to_string()
}

fn record_pretty(record: &Telemetry) -> String {
    let mut line = record.kind().name().to_string();
    for (name, value) in record_fields(record) {
        line.push(' ');
        line.push_str(&name);
        line.push('=');
        line.push_str(&value);
    }
    line
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0".to_string())
}

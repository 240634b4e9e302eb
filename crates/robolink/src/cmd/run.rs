use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use robolink_frame::messages::RobotCmd;
use robolink_link::{Bridge, CommandHandle};
use robolink_transport::{SerialTransport, SharedTransport};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cmd::RunArgs;
use crate::exit::{link_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{OutputFormat, OutputSink};

const WAIT_SLICE: Duration = Duration::from_millis(50);

/// One line of stdin: the command fields to change. Absent fields keep
/// their current value.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
struct CommandUpdate {
    vx: Option<f32>,
    vy: Option<f32>,
    wz: Option<f32>,
    chassis_yaw: Option<f32>,
    chassis_pitch: Option<f32>,
    chassis_roll: Option<f32>,
    chassis_leg_length: Option<f32>,
    gimbal_yaw: Option<f32>,
    gimbal_pitch: Option<f32>,
    fire: Option<bool>,
    fric_on: Option<bool>,
}

impl CommandUpdate {
    fn apply(&self, cmd: &mut RobotCmd) {
        let fields = [
            (self.vx, &mut cmd.speed.vx),
            (self.vy, &mut cmd.speed.vy),
            (self.wz, &mut cmd.speed.wz),
            (self.chassis_yaw, &mut cmd.chassis.yaw),
            (self.chassis_pitch, &mut cmd.chassis.pitch),
            (self.chassis_roll, &mut cmd.chassis.roll),
            (self.chassis_leg_length, &mut cmd.chassis.leg_length),
            (self.gimbal_yaw, &mut cmd.gimbal.yaw),
            (self.gimbal_pitch, &mut cmd.gimbal.pitch),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
        if let Some(fire) = self.fire {
            cmd.shoot.fire = fire;
        }
        if let Some(fric_on) = self.fric_on {
            cmd.shoot.fric_on = fric_on;
        }
    }
}

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let bridge_config = args.bridge_config()?;
    let serial_config = args.serial.to_config()?;
    let serial = SerialTransport::new(serial_config)
        .map_err(|err| transport_error("invalid port settings", err))?;
    let transport: SharedTransport = Arc::new(serial);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let sink = OutputSink::stdout(format).with_running(running.clone());
    let mut bridge = Bridge::start(transport, sink, bridge_config)
        .map_err(|err| link_error("bridge start failed", err))?;

    if !args.no_stdin {
        spawn_command_reader(bridge.commands())?;
    }

    while running.load(Ordering::SeqCst) && bridge.is_running() {
        thread::sleep(WAIT_SLICE);
    }

    info!("shutting down");
    bridge
        .shutdown()
        .map_err(|err| link_error("shutdown failed", err))?;
    Ok(SUCCESS)
}

/// Apply newline-delimited JSON updates from stdin until EOF.
///
/// The thread is detached: a blocking stdin read cannot be interrupted, and
/// the process exits from the main thread.
fn spawn_command_reader(commands: CommandHandle) -> CliResult<()> {
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!(error = %err, "stdin read failed");
                        break;
                    }
                };
                apply_line(&commands, &line);
            }
            debug!("stdin closed");
        })
        .map(|_| ())
        .map_err(|err| CliError::new(INTERNAL, format!("stdin reader spawn failed: {err}")))
}

fn apply_line(commands: &CommandHandle, line: &str) -> bool {
    let line = line.trim();
    if line.is_empty() {
        return false;
    }
    match serde_json::from_str::<CommandUpdate>(line) {
        Ok(update) => {
            commands.update(|cmd| update.apply(cmd));
            true
        }
        Err(err) => {
            warn!(error = %err, "ignoring command line");
            false
        }
    }
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn updates_change_only_named_fields() {
        let commands = CommandHandle::new();
        commands.set_shoot(false, true);

        assert!(apply_line(&commands, r#"{"vx": 1.0, "vy": -1.0, "wz": 0.5}"#));
        assert!(apply_line(&commands, r#"{"gimbal_yaw": 0.25, "fire": true}"#));

        let cmd = commands.snapshot();
        assert_eq!((cmd.speed.vx, cmd.speed.vy, cmd.speed.wz), (1.0, -1.0, 0.5));
        assert_eq!(cmd.gimbal.yaw, 0.25);
        assert_eq!(cmd.gimbal.pitch, 0.0);
        assert!(cmd.shoot.fire);
        assert!(cmd.shoot.fric_on);
    }

    #[test]
    fn chassis_fields_map_to_chassis_target() {
        let commands = CommandHandle::new();
        assert!(apply_line(
            &commands,
            r#"{"chassis_yaw": 1.5, "chassis_leg_length": 0.3}"#
        ));

        let chassis = commands.snapshot().chassis;
        assert_eq!(chassis.yaw, 1.5);
        assert_eq!(chassis.leg_length, 0.3);
        assert_eq!(chassis.roll, 0.0);
    }

    #[test]
    fn bad_lines_leave_state_untouched() {
        let commands = CommandHandle::new();
        commands.set_velocity(2.0, 0.0, 0.0);

        assert!(!apply_line(&commands, "not json"));
        assert!(!apply_line(&commands, r#"{"speed": 3}"#));
        assert!(!apply_line(&commands, "   "));
        assert_eq!(commands.snapshot().speed.vx, 2.0);
    }
}

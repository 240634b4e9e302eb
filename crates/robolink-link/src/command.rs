use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use robolink_frame::messages::{ChassisTarget, GimbalTarget, RobotCmd, ShootTarget, SpeedVector};

/// The command record the send loop streams to the controller.
///
/// Every accessor holds one lock for the whole record, so a snapshot always
/// equals the state after some complete update, never a mix of two.
#[derive(Debug, Default)]
pub struct CommandState {
    cmd: Mutex<RobotCmd>,
}

impl CommandState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_velocity(&self, vx: f32, vy: f32, wz: f32) {
        self.lock().speed = SpeedVector { vx, vy, wz };
    }

    pub fn set_chassis(&self, chassis: ChassisTarget) {
        self.lock().chassis = chassis;
    }

    pub fn set_gimbal(&self, yaw: f32, pitch: f32) {
        self.lock().gimbal = GimbalTarget { yaw, pitch };
    }

    pub fn set_shoot(&self, fire: bool, fric_on: bool) {
        self.lock().shoot = ShootTarget { fire, fric_on };
    }

    /// Apply several field changes as one update.
    pub fn update(&self, f: impl FnOnce(&mut RobotCmd)) {
        f(&mut self.lock());
    }

    /// Copy of the current record.
    pub fn snapshot(&self) -> RobotCmd {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, RobotCmd> {
        self.cmd.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable handle to a shared [`CommandState`].
#[derive(Debug, Clone, Default)]
pub struct CommandHandle {
    state: Arc<CommandState>,
}

impl CommandHandle {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Deref for CommandHandle {
    type Target = CommandState;

    fn deref(&self) -> &CommandState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn setters_touch_only_their_fields() {
        let commands = CommandHandle::new();
        commands.set_velocity(1.0, -1.0, 0.5);
        commands.set_gimbal(0.2, -0.1);
        commands.set_shoot(true, true);
        commands.set_chassis(ChassisTarget {
            leg_length: 0.2,
            ..ChassisTarget::default()
        });

        let cmd = commands.snapshot();
        assert_eq!(
            cmd.speed,
            SpeedVector {
                vx: 1.0,
                vy: -1.0,
                wz: 0.5
            }
        );
        assert_eq!(cmd.gimbal, GimbalTarget { yaw: 0.2, pitch: -0.1 });
        assert!(cmd.shoot.fire && cmd.shoot.fric_on);
        assert_eq!(cmd.chassis.leg_length, 0.2);
        assert_eq!(cmd.time_stamp, 0);
    }

    #[test]
    fn concurrent_writers_never_tear_a_snapshot() {
        let commands = CommandHandle::new();

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let commands = commands.clone();
                thread::spawn(move || {
                    for i in 0..2_000u32 {
                        let v = (w * 10_000 + i) as f32;
                        if i % 2 == 0 {
                            commands.set_velocity(v, v, v);
                        } else {
                            commands.update(|cmd| {
                                cmd.speed = SpeedVector { vx: v, vy: v, wz: v };
                                cmd.gimbal = GimbalTarget { yaw: v, pitch: v };
                            });
                        }
                    }
                })
            })
            .collect();

        let reader = {
            let commands = commands.clone();
            thread::spawn(move || {
                for _ in 0..5_000 {
                    let cmd = commands.snapshot();
                    assert_eq!(cmd.speed.vx, cmd.speed.vy);
                    assert_eq!(cmd.speed.vy, cmd.speed.wz);
                    assert_eq!(cmd.gimbal.yaw, cmd.gimbal.pitch);
                }
            })
        };

        for writer in writers {
            writer.join().unwrap();
        }
        reader.join().unwrap();
    }
}

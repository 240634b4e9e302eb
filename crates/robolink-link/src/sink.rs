use robolink_frame::messages::{
    AllRobotHp, DebugData, EventData, GameStatus, GimbalCmd, GroundRobotPosition, ImuData,
    RfidStatus, RobotMotion, RobotStatus, ShootCmd, Telemetry,
};

/// Receives decoded inbound records, one method per message kind.
///
/// Every method defaults to doing nothing, so a sink only implements the
/// kinds it cares about. Methods run on the receive thread; a slow sink
/// delays frame decoding.
pub trait TelemetrySink: Send {
    /// Defaults to [`on_debug_value`](Self::on_debug_value) for each named slot.
    fn on_debug(&mut self, data: &DebugData) {
        for (name, value) in data.values() {
            self.on_debug_value(&name, value);
        }
    }

    fn on_debug_value(&mut self, _name: &str, _value: f32) {}

    fn on_imu(&mut self, _imu: &ImuData) {}

    fn on_event_data(&mut self, _event: &EventData) {}

    fn on_all_robot_hp(&mut self, _hp: &AllRobotHp) {}

    fn on_game_status(&mut self, _status: &GameStatus) {}

    fn on_robot_motion(&mut self, _motion: &RobotMotion) {}

    fn on_ground_robot_position(&mut self, _position: &GroundRobotPosition) {}

    fn on_rfid_status(&mut self, _rfid: &RfidStatus) {}

    fn on_robot_status(&mut self, _status: &RobotStatus) {}

    fn on_gimbal_cmd(&mut self, _cmd: &GimbalCmd) {}

    fn on_shoot_cmd(&mut self, _cmd: &ShootCmd) {}
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for Box<S> {
    fn on_debug(&mut self, data: &DebugData) {
        (**self).on_debug(data)
    }

    fn on_debug_value(&mut self, name: &str, value: f32) {
        (**self).on_debug_value(name, value)
    }

    fn on_imu(&mut self, imu: &ImuData) {
        (**self).on_imu(imu)
    }

    fn on_event_data(&mut self, event: &EventData) {
        (**self).on_event_data(event)
    }

    fn on_all_robot_hp(&mut self, hp: &AllRobotHp) {
        (**self).on_all_robot_hp(hp)
    }

    fn on_game_status(&mut self, status: &GameStatus) {
        (**self).on_game_status(status)
    }

    fn on_robot_motion(&mut self, motion: &RobotMotion) {
        (**self).on_robot_motion(motion)
    }

    fn on_ground_robot_position(&mut self, position: &GroundRobotPosition) {
        (**self).on_ground_robot_position(position)
    }

    fn on_rfid_status(&mut self, rfid: &RfidStatus) {
        (**self).on_rfid_status(rfid)
    }

    fn on_robot_status(&mut self, status: &RobotStatus) {
        (**self).on_robot_status(status)
    }

    fn on_gimbal_cmd(&mut self, cmd: &GimbalCmd) {
        (**self).on_gimbal_cmd(cmd)
    }

    fn on_shoot_cmd(&mut self, cmd: &ShootCmd) {
        (**self).on_shoot_cmd(cmd)
    }
}

/// Route one record to the matching sink method.
pub fn dispatch<S: TelemetrySink + ?Sized>(sink: &mut S, telemetry: &Telemetry) {
    match telemetry {
        Telemetry::Debug(data) => sink.on_debug(data),
        Telemetry::Imu(imu) => sink.on_imu(imu),
        Telemetry::EventData(event) => sink.on_event_data(event),
        Telemetry::AllRobotHp(hp) => sink.on_all_robot_hp(hp),
        Telemetry::GameStatus(status) => sink.on_game_status(status),
        Telemetry::RobotMotion(motion) => sink.on_robot_motion(motion),
        Telemetry::GroundRobotPosition(position) => sink.on_ground_robot_position(position),
        Telemetry::RfidStatus(rfid) => sink.on_rfid_status(rfid),
        Telemetry::RobotStatus(status) => sink.on_robot_status(status),
        Telemetry::GimbalCmd(cmd) => sink.on_gimbal_cmd(cmd),
        Telemetry::ShootCmd(cmd) => sink.on_shoot_cmd(cmd),
    }
}

//! Message catalog: one fixed-layout record per message id.
//!
//! Every record is little-endian and packed. Inbound records start with the
//! controller's millisecond timestamp.

use std::time::Duration;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::{Serialize, Serializer};

use crate::error::{FrameError, Result};

/// Number of named values in a debug packet.
pub const DEBUG_PACKAGE_COUNT: usize = 10;

/// Length of a debug value name, NUL padded.
pub const DEBUG_NAME_LEN: usize = 10;

/// A fixed-layout payload record.
pub trait Payload: Sized {
    /// Message id carried in the header.
    const ID: u8;
    /// Exact payload size in bytes.
    const SIZE: usize;

    /// Append exactly [`Self::SIZE`] bytes.
    fn write_to<B: BufMut>(&self, dst: &mut B);

    /// Read from a buffer holding at least [`Self::SIZE`] bytes.
    fn read_from<B: Buf>(src: &mut B) -> Self;

    fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Decode, failing with `MalformedPayload` unless `src` is exactly the record size.
    fn decode(src: &[u8]) -> Result<Self> {
        if src.len() != Self::SIZE {
            return Err(FrameError::MalformedPayload {
                id: Self::ID,
                expected: Self::SIZE,
                actual: src.len(),
            });
        }
        let mut cursor = src;
        Ok(Self::read_from(&mut cursor))
    }
}

/// Inbound message ids understood by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Debug = 0x01,
    Imu = 0x02,
    EventData = 0x04,
    AllRobotHp = 0x06,
    GameStatus = 0x07,
    RobotMotion = 0x08,
    GroundRobotPosition = 0x09,
    RfidStatus = 0x0a,
    RobotStatus = 0x0b,
    GimbalCmd = 0x0c,
    ShootCmd = 0x0d,
}

impl MessageKind {
    pub const ALL: [MessageKind; 11] = [
        MessageKind::Debug,
        MessageKind::Imu,
        MessageKind::EventData,
        MessageKind::AllRobotHp,
        MessageKind::GameStatus,
        MessageKind::RobotMotion,
        MessageKind::GroundRobotPosition,
        MessageKind::RfidStatus,
        MessageKind::RobotStatus,
        MessageKind::GimbalCmd,
        MessageKind::ShootCmd,
    ];

    pub fn from_id(id: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.id() == id)
    }

    pub fn id(self) -> u8 {
        self as u8
    }

    /// Fixed payload size for this kind.
    pub fn payload_size(self) -> usize {
        match self {
            MessageKind::Debug => DebugData::SIZE,
            MessageKind::Imu => ImuData::SIZE,
            MessageKind::EventData => EventData::SIZE,
            MessageKind::AllRobotHp => AllRobotHp::SIZE,
            MessageKind::GameStatus => GameStatus::SIZE,
            MessageKind::RobotMotion => RobotMotion::SIZE,
            MessageKind::GroundRobotPosition => GroundRobotPosition::SIZE,
            MessageKind::RfidStatus => RfidStatus::SIZE,
            MessageKind::RobotStatus => RobotStatus::SIZE,
            MessageKind::GimbalCmd => GimbalCmd::SIZE,
            MessageKind::ShootCmd => ShootCmd::SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::Debug => "debug",
            MessageKind::Imu => "imu",
            MessageKind::EventData => "event_data",
            MessageKind::AllRobotHp => "all_robot_hp",
            MessageKind::GameStatus => "game_status",
            MessageKind::RobotMotion => "robot_motion",
            MessageKind::GroundRobotPosition => "ground_robot_position",
            MessageKind::RfidStatus => "rfid_status",
            MessageKind::RobotStatus => "robot_status",
            MessageKind::GimbalCmd => "gimbal_cmd",
            MessageKind::ShootCmd => "shoot_cmd",
        }
    }
}

/// A decoded inbound record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Telemetry {
    Debug(DebugData),
    Imu(ImuData),
    EventData(EventData),
    AllRobotHp(AllRobotHp),
    GameStatus(GameStatus),
    RobotMotion(RobotMotion),
    GroundRobotPosition(GroundRobotPosition),
    RfidStatus(RfidStatus),
    RobotStatus(RobotStatus),
    GimbalCmd(GimbalCmd),
    ShootCmd(ShootCmd),
}

impl Telemetry {
    /// Decode `payload` according to `kind`.
    pub fn decode(kind: MessageKind, payload: &[u8]) -> Result<Self> {
        Ok(match kind {
            MessageKind::Debug => Telemetry::Debug(DebugData::decode(payload)?),
            MessageKind::Imu => Telemetry::Imu(ImuData::decode(payload)?),
            MessageKind::EventData => Telemetry::EventData(EventData::decode(payload)?),
            MessageKind::AllRobotHp => Telemetry::AllRobotHp(AllRobotHp::decode(payload)?),
            MessageKind::GameStatus => Telemetry::GameStatus(GameStatus::decode(payload)?),
            MessageKind::RobotMotion => Telemetry::RobotMotion(RobotMotion::decode(payload)?),
            MessageKind::GroundRobotPosition => {
                Telemetry::GroundRobotPosition(GroundRobotPosition::decode(payload)?)
            }
            MessageKind::RfidStatus => Telemetry::RfidStatus(RfidStatus::decode(payload)?),
            MessageKind::RobotStatus => Telemetry::RobotStatus(RobotStatus::decode(payload)?),
            MessageKind::GimbalCmd => Telemetry::GimbalCmd(GimbalCmd::decode(payload)?),
            MessageKind::ShootCmd => Telemetry::ShootCmd(ShootCmd::decode(payload)?),
        })
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Telemetry::Debug(_) => MessageKind::Debug,
            Telemetry::Imu(_) => MessageKind::Imu,
            Telemetry::EventData(_) => MessageKind::EventData,
            Telemetry::AllRobotHp(_) => MessageKind::AllRobotHp,
            Telemetry::GameStatus(_) => MessageKind::GameStatus,
            Telemetry::RobotMotion(_) => MessageKind::RobotMotion,
            Telemetry::GroundRobotPosition(_) => MessageKind::GroundRobotPosition,
            Telemetry::RfidStatus(_) => MessageKind::RfidStatus,
            Telemetry::RobotStatus(_) => MessageKind::RobotStatus,
            Telemetry::GimbalCmd(_) => MessageKind::GimbalCmd,
            Telemetry::ShootCmd(_) => MessageKind::ShootCmd,
        }
    }

    /// Encode the record's payload bytes.
    pub fn encode(&self) -> Bytes {
        match self {
            Telemetry::Debug(m) => m.encode(),
            Telemetry::Imu(m) => m.encode(),
            Telemetry::EventData(m) => m.encode(),
            Telemetry::AllRobotHp(m) => m.encode(),
            Telemetry::GameStatus(m) => m.encode(),
            Telemetry::RobotMotion(m) => m.encode(),
            Telemetry::GroundRobotPosition(m) => m.encode(),
            Telemetry::RfidStatus(m) => m.encode(),
            Telemetry::RobotStatus(m) => m.encode(),
            Telemetry::GimbalCmd(m) => m.encode(),
            Telemetry::ShootCmd(m) => m.encode(),
        }
    }
}

/// Decode a payload by raw message id.
pub fn decode_payload(message_id: u8, payload: &[u8]) -> Result<Telemetry> {
    let kind = MessageKind::from_id(message_id).ok_or(FrameError::UnknownKind(message_id))?;
    Telemetry::decode(kind, payload)
}

fn timestamp(ms: u32) -> Duration {
    Duration::from_millis(u64::from(ms))
}

// ---------------------------------------------------------------------------
// Debug
// ---------------------------------------------------------------------------

/// One named value in a debug packet.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct DebugPackage {
    #[serde(serialize_with = "serialize_debug_name")]
    pub name: [u8; DEBUG_NAME_LEN],
    #[serde(rename = "type")]
    pub kind: u8,
    pub value: f32,
}

impl DebugPackage {
    /// Build a package, truncating `name` to the wire length.
    pub fn new(name: &str, value: f32) -> Self {
        let mut raw = [0u8; DEBUG_NAME_LEN];
        let len = name.len().min(DEBUG_NAME_LEN);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self {
            name: raw,
            kind: 0,
            value,
        }
    }

    /// The name up to the first NUL, lossily decoded.
    pub fn name(&self) -> String {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(DEBUG_NAME_LEN);
        String::from_utf8_lossy(&self.name[..end]).into_owned()
    }
}

fn serialize_debug_name<S: Serializer>(
    name: &[u8; DEBUG_NAME_LEN],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let end = name.iter().position(|&b| b == 0).unwrap_or(DEBUG_NAME_LEN);
    serializer.serialize_str(&String::from_utf8_lossy(&name[..end]))
}

/// Named debug values streamed by the controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DebugData {
    pub time_stamp: u32,
    pub packages: [DebugPackage; DEBUG_PACKAGE_COUNT],
}

impl DebugData {
    /// `(name, value)` pairs, skipping unused slots.
    pub fn values(&self) -> impl Iterator<Item = (String, f32)> + '_ {
        self.packages
            .iter()
            .map(|package| (package.name(), package.value))
            .filter(|(name, _)| !name.is_empty())
    }
}

impl Payload for DebugData {
    const ID: u8 = MessageKind::Debug as u8;
    const SIZE: usize = 4 + DEBUG_PACKAGE_COUNT * (DEBUG_NAME_LEN + 1 + 4);

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        for package in &self.packages {
            dst.put_slice(&package.name);
            dst.put_u8(package.kind);
            dst.put_f32_le(package.value);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        let time_stamp = src.get_u32_le();
        let mut packages = [DebugPackage::default(); DEBUG_PACKAGE_COUNT];
        for package in &mut packages {
            src.copy_to_slice(&mut package.name);
            package.kind = src.get_u8();
            package.value = src.get_f32_le();
        }
        Self {
            time_stamp,
            packages,
        }
    }
}

// ---------------------------------------------------------------------------
// IMU
// ---------------------------------------------------------------------------

/// Attitude and angular rates, radians and radians per second.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ImuData {
    pub time_stamp: u32,
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub yaw_vel: f32,
    pub pitch_vel: f32,
    pub roll_vel: f32,
}

impl ImuData {
    /// Controller uptime at which the sample was taken.
    pub fn timestamp(&self) -> Duration {
        timestamp(self.time_stamp)
    }

    /// Orientation as a unit quaternion `[x, y, z, w]` (fixed-axis roll, pitch, yaw).
    pub fn quaternion(&self) -> [f32; 4] {
        let (sr, cr) = (self.roll * 0.5).sin_cos();
        let (sp, cp) = (self.pitch * 0.5).sin_cos();
        let (sy, cy) = (self.yaw * 0.5).sin_cos();
        [
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
            cr * cp * cy + sr * sp * sy,
        ]
    }
}

impl Payload for ImuData {
    const ID: u8 = MessageKind::Imu as u8;
    const SIZE: usize = 4 + 6 * 4;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        for v in [
            self.yaw,
            self.pitch,
            self.roll,
            self.yaw_vel,
            self.pitch_vel,
            self.roll_vel,
        ] {
            dst.put_f32_le(v);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            yaw: src.get_f32_le(),
            pitch: src.get_f32_le(),
            roll: src.get_f32_le(),
            yaw_vel: src.get_f32_le(),
            pitch_vel: src.get_f32_le(),
            roll_vel: src.get_f32_le(),
        }
    }
}

// ---------------------------------------------------------------------------
// Referee system
// ---------------------------------------------------------------------------

/// Field event occupancy flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct EventData {
    pub time_stamp: u32,
    pub supply_station_front: u8,
    pub supply_station_internal: u8,
    pub supply_zone: u8,
    pub center_gain_zone: u8,
    pub small_energy: u8,
    pub big_energy: u8,
    pub circular_highland: u8,
    pub trapezoidal_highland_3: u8,
    pub trapezoidal_highland_4: u8,
    pub base_virtual_shield_remaining: u8,
}

impl Payload for EventData {
    const ID: u8 = MessageKind::EventData as u8;
    const SIZE: usize = 4 + 10;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_slice(&[
            self.supply_station_front,
            self.supply_station_internal,
            self.supply_zone,
            self.center_gain_zone,
            self.small_energy,
            self.big_energy,
            self.circular_highland,
            self.trapezoidal_highland_3,
            self.trapezoidal_highland_4,
            self.base_virtual_shield_remaining,
        ]);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            supply_station_front: src.get_u8(),
            supply_station_internal: src.get_u8(),
            supply_zone: src.get_u8(),
            center_gain_zone: src.get_u8(),
            small_energy: src.get_u8(),
            big_energy: src.get_u8(),
            circular_highland: src.get_u8(),
            trapezoidal_highland_3: src.get_u8(),
            trapezoidal_highland_4: src.get_u8(),
            base_virtual_shield_remaining: src.get_u8(),
        }
    }
}

/// Hit points of every robot and structure on both teams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct AllRobotHp {
    pub time_stamp: u32,
    pub red_1_robot_hp: u16,
    pub red_2_robot_hp: u16,
    pub red_3_robot_hp: u16,
    pub red_4_robot_hp: u16,
    pub red_5_robot_hp: u16,
    pub red_7_robot_hp: u16,
    pub red_outpost_hp: u16,
    pub red_base_hp: u16,
    pub blue_1_robot_hp: u16,
    pub blue_2_robot_hp: u16,
    pub blue_3_robot_hp: u16,
    pub blue_4_robot_hp: u16,
    pub blue_5_robot_hp: u16,
    pub blue_7_robot_hp: u16,
    pub blue_outpost_hp: u16,
    pub blue_base_hp: u16,
}

impl AllRobotHp {
    fn fields(&self) -> [u16; 16] {
        [
            self.red_1_robot_hp,
            self.red_2_robot_hp,
            self.red_3_robot_hp,
            self.red_4_robot_hp,
            self.red_5_robot_hp,
            self.red_7_robot_hp,
            self.red_outpost_hp,
            self.red_base_hp,
            self.blue_1_robot_hp,
            self.blue_2_robot_hp,
            self.blue_3_robot_hp,
            self.blue_4_robot_hp,
            self.blue_5_robot_hp,
            self.blue_7_robot_hp,
            self.blue_outpost_hp,
            self.blue_base_hp,
        ]
    }
}

impl Payload for AllRobotHp {
    const ID: u8 = MessageKind::AllRobotHp as u8;
    const SIZE: usize = 4 + 16 * 2;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        for hp in self.fields() {
            dst.put_u16_le(hp);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            red_1_robot_hp: src.get_u16_le(),
            red_2_robot_hp: src.get_u16_le(),
            red_3_robot_hp: src.get_u16_le(),
            red_4_robot_hp: src.get_u16_le(),
            red_5_robot_hp: src.get_u16_le(),
            red_7_robot_hp: src.get_u16_le(),
            red_outpost_hp: src.get_u16_le(),
            red_base_hp: src.get_u16_le(),
            blue_1_robot_hp: src.get_u16_le(),
            blue_2_robot_hp: src.get_u16_le(),
            blue_3_robot_hp: src.get_u16_le(),
            blue_4_robot_hp: src.get_u16_le(),
            blue_5_robot_hp: src.get_u16_le(),
            blue_7_robot_hp: src.get_u16_le(),
            blue_outpost_hp: src.get_u16_le(),
            blue_base_hp: src.get_u16_le(),
        }
    }
}

/// Match phase reported by the referee system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameProgress {
    NotStarted,
    Preparation,
    SelfChecking,
    Countdown,
    Running,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct GameStatus {
    pub time_stamp: u32,
    pub game_progress: u8,
    /// Seconds left in the current stage.
    pub stage_remain_time: u16,
}

impl GameStatus {
    pub fn progress(&self) -> Option<GameProgress> {
        match self.game_progress {
            0 => Some(GameProgress::NotStarted),
            1 => Some(GameProgress::Preparation),
            2 => Some(GameProgress::SelfChecking),
            3 => Some(GameProgress::Countdown),
            4 => Some(GameProgress::Running),
            5 => Some(GameProgress::GameOver),
            _ => None,
        }
    }
}

impl Payload for GameStatus {
    const ID: u8 = MessageKind::GameStatus as u8;
    const SIZE: usize = 4 + 1 + 2;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_u8(self.game_progress);
        dst.put_u16_le(self.stage_remain_time);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            game_progress: src.get_u8(),
            stage_remain_time: src.get_u16_le(),
        }
    }
}

// ---------------------------------------------------------------------------
// Motion and positions
// ---------------------------------------------------------------------------

/// Measured chassis velocity, m/s and rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RobotMotion {
    pub time_stamp: u32,
    pub vx: f32,
    pub vy: f32,
    pub wz: f32,
}

impl Payload for RobotMotion {
    const ID: u8 = MessageKind::RobotMotion as u8;
    const SIZE: usize = 4 + 3 * 4;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_f32_le(self.vx);
        dst.put_f32_le(self.vy);
        dst.put_f32_le(self.wz);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            vx: src.get_f32_le(),
            vy: src.get_f32_le(),
            wz: src.get_f32_le(),
        }
    }
}

/// Field positions of friendly ground robots, metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GroundRobotPosition {
    pub time_stamp: u32,
    pub hero_x: f32,
    pub hero_y: f32,
    pub engineer_x: f32,
    pub engineer_y: f32,
    pub standard_3_x: f32,
    pub standard_3_y: f32,
    pub standard_4_x: f32,
    pub standard_4_y: f32,
    pub standard_5_x: f32,
    pub standard_5_y: f32,
}

impl Payload for GroundRobotPosition {
    const ID: u8 = MessageKind::GroundRobotPosition as u8;
    const SIZE: usize = 4 + 10 * 4;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        for v in [
            self.hero_x,
            self.hero_y,
            self.engineer_x,
            self.engineer_y,
            self.standard_3_x,
            self.standard_3_y,
            self.standard_4_x,
            self.standard_4_y,
            self.standard_5_x,
            self.standard_5_y,
        ] {
            dst.put_f32_le(v);
        }
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            hero_x: src.get_f32_le(),
            hero_y: src.get_f32_le(),
            engineer_x: src.get_f32_le(),
            engineer_y: src.get_f32_le(),
            standard_3_x: src.get_f32_le(),
            standard_3_y: src.get_f32_le(),
            standard_4_x: src.get_f32_le(),
            standard_4_y: src.get_f32_le(),
            standard_5_x: src.get_f32_le(),
            standard_5_y: src.get_f32_le(),
        }
    }
}

/// RFID gain points, one bit each in [`RfidStatus::gain_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RfidPoint {
    BaseGainPoint,
    CircularHighlandGainPoint,
    EnemyCircularHighlandGainPoint,
    FriendlyR3B3GainPoint,
    EnemyR3B3GainPoint,
    FriendlyR4B4GainPoint,
    EnemyR4B4GainPoint,
    EnergyMechanismGainPoint,
    FriendlyFlyRampFrontGainPoint,
    FriendlyFlyRampBackGainPoint,
    EnemyFlyRampFrontGainPoint,
    EnemyFlyRampBackGainPoint,
    FriendlyOutpostGainPoint,
    FriendlyHealingPoint,
    FriendlySentryPatrolArea,
    EnemySentryPatrolArea,
    FriendlyBigResourceIsland,
    EnemyBigResourceIsland,
    FriendlyExchangeArea,
    CenterGainPoint,
}

impl RfidPoint {
    pub const ALL: [RfidPoint; 20] = [
        RfidPoint::BaseGainPoint,
        RfidPoint::CircularHighlandGainPoint,
        RfidPoint::EnemyCircularHighlandGainPoint,
        RfidPoint::FriendlyR3B3GainPoint,
        RfidPoint::EnemyR3B3GainPoint,
        RfidPoint::FriendlyR4B4GainPoint,
        RfidPoint::EnemyR4B4GainPoint,
        RfidPoint::EnergyMechanismGainPoint,
        RfidPoint::FriendlyFlyRampFrontGainPoint,
        RfidPoint::FriendlyFlyRampBackGainPoint,
        RfidPoint::EnemyFlyRampFrontGainPoint,
        RfidPoint::EnemyFlyRampBackGainPoint,
        RfidPoint::FriendlyOutpostGainPoint,
        RfidPoint::FriendlyHealingPoint,
        RfidPoint::FriendlySentryPatrolArea,
        RfidPoint::EnemySentryPatrolArea,
        RfidPoint::FriendlyBigResourceIsland,
        RfidPoint::EnemyBigResourceIsland,
        RfidPoint::FriendlyExchangeArea,
        RfidPoint::CenterGainPoint,
    ];

    pub fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RfidStatus {
    pub time_stamp: u32,
    pub gain_points: u32,
}

impl RfidStatus {
    pub fn contains(&self, point: RfidPoint) -> bool {
        self.gain_points & point.bit() != 0
    }

    /// Points currently detected.
    pub fn active(&self) -> impl Iterator<Item = RfidPoint> + '_ {
        RfidPoint::ALL
            .into_iter()
            .filter(move |point| self.contains(*point))
    }
}

impl Payload for RfidStatus {
    const ID: u8 = MessageKind::RfidStatus as u8;
    const SIZE: usize = 4 + 4;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_u32_le(self.gain_points);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            gain_points: src.get_u32_le(),
        }
    }
}

/// Why the referee system last deducted hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HpDeductionReason {
    ArmorHit,
    SystemOffline,
    OverShootSpeed,
    OverHeat,
    OverPower,
    ArmorCollision,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RobotStatus {
    pub time_stamp: u32,
    pub robot_id: u8,
    pub robot_level: u8,
    pub current_hp: u16,
    pub maximum_hp: u16,
    pub shooter_barrel_cooling_value: u16,
    pub shooter_barrel_heat_limit: u16,
    pub shooter_17mm_1_barrel_heat: u16,
    pub robot_pos_x: f32,
    pub robot_pos_y: f32,
    pub robot_pos_angle: f32,
    pub armor_id: u8,
    pub hp_deduction_reason: u8,
    pub projectile_allowance_17mm_1: u16,
    pub remaining_gold_coin: u16,
}

impl RobotStatus {
    pub fn hp_deduction(&self) -> Option<HpDeductionReason> {
        match self.hp_deduction_reason {
            0 => Some(HpDeductionReason::ArmorHit),
            1 => Some(HpDeductionReason::SystemOffline),
            2 => Some(HpDeductionReason::OverShootSpeed),
            3 => Some(HpDeductionReason::OverHeat),
            4 => Some(HpDeductionReason::OverPower),
            5 => Some(HpDeductionReason::ArmorCollision),
            _ => None,
        }
    }
}

impl Payload for RobotStatus {
    const ID: u8 = MessageKind::RobotStatus as u8;
    const SIZE: usize = 4 + 1 + 1 + 5 * 2 + 3 * 4 + 1 + 1 + 2 + 2;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_u8(self.robot_id);
        dst.put_u8(self.robot_level);
        dst.put_u16_le(self.current_hp);
        dst.put_u16_le(self.maximum_hp);
        dst.put_u16_le(self.shooter_barrel_cooling_value);
        dst.put_u16_le(self.shooter_barrel_heat_limit);
        dst.put_u16_le(self.shooter_17mm_1_barrel_heat);
        dst.put_f32_le(self.robot_pos_x);
        dst.put_f32_le(self.robot_pos_y);
        dst.put_f32_le(self.robot_pos_angle);
        dst.put_u8(self.armor_id);
        dst.put_u8(self.hp_deduction_reason);
        dst.put_u16_le(self.projectile_allowance_17mm_1);
        dst.put_u16_le(self.remaining_gold_coin);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            robot_id: src.get_u8(),
            robot_level: src.get_u8(),
            current_hp: src.get_u16_le(),
            maximum_hp: src.get_u16_le(),
            shooter_barrel_cooling_value: src.get_u16_le(),
            shooter_barrel_heat_limit: src.get_u16_le(),
            shooter_17mm_1_barrel_heat: src.get_u16_le(),
            robot_pos_x: src.get_f32_le(),
            robot_pos_y: src.get_f32_le(),
            robot_pos_angle: src.get_f32_le(),
            armor_id: src.get_u8(),
            hp_deduction_reason: src.get_u8(),
            projectile_allowance_17mm_1: src.get_u16_le(),
            remaining_gold_coin: src.get_u16_le(),
        }
    }
}

/// Gimbal target currently applied by the controller, radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GimbalCmd {
    pub time_stamp: u32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Payload for GimbalCmd {
    const ID: u8 = MessageKind::GimbalCmd as u8;
    const SIZE: usize = 4 + 2 * 4;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_f32_le(self.yaw);
        dst.put_f32_le(self.pitch);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            yaw: src.get_f32_le(),
            pitch: src.get_f32_le(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShootCmd {
    pub time_stamp: u32,
    pub projectile_num: u8,
}

impl Payload for ShootCmd {
    const ID: u8 = MessageKind::ShootCmd as u8;
    const SIZE: usize = 4 + 1;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_u8(self.projectile_num);
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            projectile_num: src.get_u8(),
        }
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Chassis velocity target, m/s and rad/s.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SpeedVector {
    pub vx: f32,
    pub vy: f32,
    pub wz: f32,
}

/// Chassis attitude target (balancing and legged chassis).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ChassisTarget {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
    pub leg_length: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct GimbalTarget {
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShootTarget {
    pub fire: bool,
    pub fric_on: bool,
}

/// Host → controller command record, sent continuously by the send loop.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct RobotCmd {
    /// Milliseconds since the send loop started.
    pub time_stamp: u32,
    pub speed: SpeedVector,
    pub chassis: ChassisTarget,
    pub gimbal: GimbalTarget,
    pub shoot: ShootTarget,
}

impl Payload for RobotCmd {
    const ID: u8 = 0x01;
    const SIZE: usize = 4 + 3 * 4 + 4 * 4 + 2 * 4 + 2;

    fn write_to<B: BufMut>(&self, dst: &mut B) {
        dst.put_u32_le(self.time_stamp);
        dst.put_f32_le(self.speed.vx);
        dst.put_f32_le(self.speed.vy);
        dst.put_f32_le(self.speed.wz);
        dst.put_f32_le(self.chassis.yaw);
        dst.put_f32_le(self.chassis.pitch);
        dst.put_f32_le(self.chassis.roll);
        dst.put_f32_le(self.chassis.leg_length);
        dst.put_f32_le(self.gimbal.yaw);
        dst.put_f32_le(self.gimbal.pitch);
        dst.put_u8(u8::from(self.shoot.fire));
        dst.put_u8(u8::from(self.shoot.fric_on));
    }

    fn read_from<B: Buf>(src: &mut B) -> Self {
        Self {
            time_stamp: src.get_u32_le(),
            speed: SpeedVector {
                vx: src.get_f32_le(),
                vy: src.get_f32_le(),
                wz: src.get_f32_le(),
            },
            chassis: ChassisTarget {
                yaw: src.get_f32_le(),
                pitch: src.get_f32_le(),
                roll: src.get_f32_le(),
                leg_length: src.get_f32_le(),
            },
            gimbal: GimbalTarget {
                yaw: src.get_f32_le(),
                pitch: src.get_f32_le(),
            },
            shoot: ShootTarget {
                fire: src.get_u8() != 0,
                fric_on: src.get_u8() != 0,
            },
        }
    }
}

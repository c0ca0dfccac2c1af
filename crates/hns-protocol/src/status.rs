//! 上行状态反馈
//!
//! payload 固定 6 字节（5 个字段，小端）：
//!
//! | 偏移 | 类型 | 字段 |
//! |---|---|---|
//! | 0 | u8 | 当前速度（raw / 80） |
//! | 1 | i8 | X 加速度（raw / 6） |
//! | 2 | i8 | Y 加速度（raw / 6） |
//! | 3-4 | u16 LE | 轮圈计数（raw / 9） |
//! | 5 | u8 | 状态字节（Bit 0：货物已装载） |

use crate::FrameError;
use crate::codec::{Frame, decode, encode};

/// 上行 payload 长度
pub const STATUS_PAYLOAD_LEN: usize = 6;

/// 状态字节中的"货物已装载"标志位
pub const CARGO_PICKUP_BIT: u8 = 0x01;

const SPEED_DIVISOR: f64 = 80.0;
const ACCEL_DIVISOR: f64 = 6.0;
const WHEEL_CYCLES_DIVISOR: f64 = 9.0;

/// 原始状态记录（未换算）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawStatus {
    pub speed: u8,
    pub accel_x: i8,
    pub accel_y: i8,
    pub wheel_cycles: u16,
    pub status_byte: u8,
}

impl RawStatus {
    /// 从去转义后的 payload 解析
    ///
    /// # 错误
    /// - `FrameError::InvalidLength`: payload 不是 6 字节
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        let bytes: [u8; STATUS_PAYLOAD_LEN] =
            payload.try_into().map_err(|_| FrameError::InvalidLength {
                expected: STATUS_PAYLOAD_LEN,
                actual: payload.len(),
            })?;

        Ok(Self {
            speed: bytes[0],
            accel_x: bytes[1] as i8,
            accel_y: bytes[2] as i8,
            wheel_cycles: u16::from_le_bytes([bytes[3], bytes[4]]),
            status_byte: bytes[5],
        })
    }

    /// 直接从完整帧解析（decode + from_payload）
    pub fn from_frame(frame: &[u8]) -> Result<Self, FrameError> {
        Self::from_payload(&decode(frame)?)
    }

    pub fn to_payload(&self) -> [u8; STATUS_PAYLOAD_LEN] {
        let [cycles_lo, cycles_hi] = self.wheel_cycles.to_le_bytes();
        [
            self.speed,
            self.accel_x as u8,
            self.accel_y as u8,
            cycles_lo,
            cycles_hi,
            self.status_byte,
        ]
    }

    pub fn to_frame(&self) -> Frame {
        encode(&self.to_payload())
    }
}

/// 换算后的状态快照
///
/// 由 RX 线程在每次成功解码后整体替换，读取方拿到的是一致的副本。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusSnapshot {
    /// 当前速度
    pub current_speed: f64,
    /// X 方向加速度
    pub accel_x: f64,
    /// Y 方向加速度
    pub accel_y: f64,
    /// 轮圈计数
    pub wheel_cycles: f64,
    /// 原始状态字节
    pub status_byte: u8,
}

impl StatusSnapshot {
    /// 货物（方块）是否已被吊臂装载
    pub fn cargo_picked(&self) -> bool {
        self.status_byte & CARGO_PICKUP_BIT != 0
    }

    /// 车辆是否已静止（速度严格为 0）
    pub fn is_stopped(&self) -> bool {
        self.current_speed == 0.0
    }
}

impl From<RawStatus> for StatusSnapshot {
    fn from(raw: RawStatus) -> Self {
        Self {
            current_speed: raw.speed as f64 / SPEED_DIVISOR,
            accel_x: raw.accel_x as f64 / ACCEL_DIVISOR,
            accel_y: raw.accel_y as f64 / ACCEL_DIVISOR,
            wheel_cycles: raw.wheel_cycles as f64 / WHEEL_CYCLES_DIVISOR,
            status_byte: raw.status_byte,
        }
    }
}

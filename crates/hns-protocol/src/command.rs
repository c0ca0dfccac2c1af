//! 下行运动指令
//!
//! 每帧 payload 固定 2 字节：`[speed, distance_ticks]`。

use crate::FrameError;
use crate::codec::{Frame, encode};

/// 一个距离刻度对应的毫米数（轮编码器分辨率）
pub const TICK_LENGTH_MM: f64 = 8.45;

/// 速度字节满量程
pub const SPEED_FULL_SCALE: f64 = 255.0;

/// 下行 payload 长度
pub const COMMAND_PAYLOAD_LEN: usize = 2;

/// 运动指令
///
/// 由控制线程覆盖写入，由 TX 线程读取发送。
/// 两个字段相互独立：修改速度不影响距离，反之亦然。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MovementCommand {
    /// 目标速度（0-255，由 0-100% 换算）
    pub speed: u8,
    /// 剩余行驶距离（刻度，有符号）
    pub distance_ticks: i32,
}

impl MovementCommand {
    /// 百分比 → 速度字节：`round(255 / 100 × percent)`
    ///
    /// 超出 0..=100 的百分比会被截断到边界。
    pub fn speed_from_percent(percent: i32) -> u8 {
        let percent = percent.clamp(0, 100) as f64;
        (SPEED_FULL_SCALE / 100.0 * percent).round() as u8
    }

    /// 毫米 → 刻度：`round(distance_mm / 8.45)`
    pub fn ticks_from_mm(distance_mm: f64) -> i32 {
        (distance_mm / TICK_LENGTH_MM).round() as i32
    }

    /// 返回仅修改速度后的新指令
    pub fn with_speed_percent(self, percent: i32) -> Self {
        Self {
            speed: Self::speed_from_percent(percent),
            ..self
        }
    }

    /// 返回仅修改距离后的新指令
    pub fn with_distance_mm(self, distance_mm: f64) -> Self {
        Self {
            distance_ticks: Self::ticks_from_mm(distance_mm),
            ..self
        }
    }

    /// 打包为线上 payload
    ///
    /// # 错误
    /// - `FrameError::ValueOutOfRange`: 距离刻度无法放入一个无符号字节（0..=255）
    pub fn to_payload(&self) -> Result<[u8; COMMAND_PAYLOAD_LEN], FrameError> {
        let ticks = u8::try_from(self.distance_ticks).map_err(|_| FrameError::ValueOutOfRange {
            field: "distance_ticks",
            value: self.distance_ticks as i64,
        })?;
        Ok([self.speed, ticks])
    }

    /// 打包并编码为完整帧
    pub fn to_frame(&self) -> Result<Frame, FrameError> {
        Ok(encode(&self.to_payload()?))
    }

    /// 从 payload 还原指令（模拟控制器使用）
    pub fn from_payload(payload: &[u8]) -> Result<Self, FrameError> {
        let [speed, ticks]: [u8; COMMAND_PAYLOAD_LEN] =
            payload.try_into().map_err(|_| FrameError::InvalidLength {
                expected: COMMAND_PAYLOAD_LEN,
                actual: payload.len(),
            })?;
        Ok(Self {
            speed,
            distance_ticks: ticks as i32,
        })
    }
}

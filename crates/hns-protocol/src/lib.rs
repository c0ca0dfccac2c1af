//! # HNS Protocol
//!
//! 电机控制器串口协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `codec`: 帧编解码（字节填充 / Byte Stuffing）
//! - `command`: 下行运动指令（速度 + 行驶距离）
//! - `status`: 上行状态反馈（速度、加速度、轮圈计数、状态字节）
//!
//! ## 帧格式
//!
//! ```text
//! 0x7E | payload (转义后) | 0x7D
//! ```
//!
//! payload 中出现的 `0x7E`/`0x7D`/`0x7C` 会被编码为 `0x7C, byte ^ 0x20`。
//!
//! ## 字节序
//!
//! 多字节字段使用小端字节序（Little Endian）。

pub mod codec;
pub mod command;
pub mod status;

// 重新导出常用类型
pub use codec::*;
pub use command::*;
pub use status::*;

use thiserror::Error;

/// 协议解析错误类型
///
/// 所有变体都是可恢复的：IO 线程记录日志后丢弃该帧，继续运行。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// 帧边界不合法（长度不足，或首尾不是 START/STOP）
    #[error("Invalid frame: {len} bytes, missing START/STOP delimiters")]
    InvalidFrame { len: usize },

    #[error("Invalid payload length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// 字段值无法放入对应的线上字节
    #[error("Value out of range for field {field}: {value}")]
    ValueOutOfRange { field: &'static str, value: i64 },
}

/// 将字节序列格式化为大写十六进制（用于 trace 日志）
pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::InvalidFrame { len: 1 };
        assert!(err.to_string().contains("Invalid frame"));

        let err = FrameError::InvalidLength {
            expected: 6,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "Invalid payload length: expected 6, got 2"
        );

        let err = FrameError::ValueOutOfRange {
            field: "distance_ticks",
            value: 300,
        };
        assert!(err.to_string().contains("distance_ticks"));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(&[0x7E, 0x01, 0x7D]), "7E017D");
        assert_eq!(to_hex(&[]), "");
    }
}

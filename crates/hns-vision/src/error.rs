//! 视觉层错误类型定义

use thiserror::Error;

/// 摄像头 / 采集错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// 帧源已耗尽（不会再产生新帧）
    #[error("Frame source exhausted")]
    Exhausted,

    /// 摄像头设备错误
    #[error("Camera device error: {0}")]
    Device(String),

    /// 单帧损坏，可以跳过
    #[error("Corrupt frame: {0}")]
    Corrupt(String),

    /// 图像尺寸与数据长度不匹配
    #[error("Invalid image buffer: expected {expected} bytes, got {actual}")]
    InvalidImage { expected: usize, actual: usize },

    #[error("Invalid image dimensions: {width}x{height}x{channels}")]
    ImageDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },

    #[error("Capture is already running")]
    AlreadyRunning,

    #[error("Capture is not running")]
    NotRunning,

    #[error("Capture thread error: {0}")]
    Thread(String),
}

impl CaptureError {
    /// 采集线程遇到后应退出的错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, CaptureError::Exhausted | CaptureError::Device(_))
    }
}

/// 感知协作者（信号定位 / 数字识别）错误
///
/// 所有调用方都把它当作"本帧未检测到"处理。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Classification failed: {0}")]
    Failed(String),

    /// 数字识别结果不在 0-9 范围内
    #[error("Digit out of range: {0}")]
    InvalidDigit(u8),
}

/// 投票池错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VotingError {
    /// 未调用 `run()` 就调用 `get_result()`（调用顺序错误）
    #[error("Voting pool has not been started")]
    NotStarted,

    #[error("Voting pool is already running")]
    AlreadyRunning,

    #[error("Voting worker {0} panicked")]
    WorkerPanicked(usize),

    #[error("Invalid voting configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to spawn voting worker: {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_error_fatality() {
        assert!(CaptureError::Exhausted.is_fatal());
        assert!(CaptureError::Device("unplugged".into()).is_fatal());
        assert!(!CaptureError::Corrupt("short read".into()).is_fatal());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            VotingError::NotStarted.to_string(),
            "Voting pool has not been started"
        );
        assert_eq!(
            ClassificationError::InvalidDigit(12).to_string(),
            "Digit out of range: 12"
        );
        let err = CaptureError::InvalidImage {
            expected: 12,
            actual: 10,
        };
        assert!(err.to_string().contains("expected 12 bytes"));
    }
}

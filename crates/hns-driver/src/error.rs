//! 驱动层错误类型定义

use hns_protocol::FrameError;
use hns_serial::LinkError;
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 串口链路错误（`start()` 时设备不可用为致命错误）
    #[error("Serial link error: {0}")]
    Link(#[from] LinkError),

    /// 协议编解码错误
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    /// 运行时未启动
    #[error("Communication runtime is not running")]
    NotRunning,

    /// IO 线程错误（panic 或无法创建）
    #[error("IO thread error: {0}")]
    IoThread(String),

    /// 操作超时
    #[error("Operation timeout")]
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::DriverError;
    use hns_protocol::FrameError;
    use hns_serial::LinkError;

    #[test]
    fn test_driver_error_display() {
        let driver_error = DriverError::Link(LinkError::Closed);
        assert_eq!(driver_error.to_string(), "Serial link error: Link closed");

        let driver_error = DriverError::Frame(FrameError::InvalidFrame { len: 1 });
        assert!(driver_error.to_string().contains("Invalid frame"));

        assert_eq!(DriverError::Timeout.to_string(), "Operation timeout");

        let driver_error = DriverError::IoThread("spawn failed".to_string());
        let msg = driver_error.to_string();
        assert!(msg.contains("IO thread") && msg.contains("spawn failed"));
    }

    #[test]
    fn test_from_link_error() {
        let driver_error: DriverError = LinkError::NotFound("/dev/serial0".into()).into();
        match driver_error {
            DriverError::Link(LinkError::NotFound(port)) => assert_eq!(port, "/dev/serial0"),
            _ => panic!("Expected Link variant"),
        }
    }

    #[test]
    fn test_from_frame_error() {
        let frame_error = FrameError::InvalidLength {
            expected: 6,
            actual: 3,
        };
        let driver_error: DriverError = frame_error.into();
        assert!(matches!(
            driver_error,
            DriverError::Frame(FrameError::InvalidLength { expected: 6, actual: 3 })
        ));
    }
}

//! # HNS Serial Link Layer
//!
//! 串口硬件抽象层，提供统一的收发接口。
//!
//! - `serial`: 基于 `serialport` 的真实串口（树莓派 `/dev/serial0`）
//! - `mock`: 进程内模拟电机控制器（`mock` feature）
//!
//! 链路在连接时被拆分为独立的 RX / TX 两半，分别交给接收线程和发送线程，
//! 两个线程互不阻塞。

use std::time::Duration;
use thiserror::Error;

pub mod serial;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use serial::SerialPortConnector;

/// 串口链路统一错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("Serial device not found: {0}")]
    NotFound(String),
    #[error("Link closed")]
    Closed,
}

impl LinkError {
    /// 是否为致命错误（设备消失、链路关闭），IO 线程遇到后应退出
    pub fn is_fatal(&self) -> bool {
        match self {
            LinkError::NotFound(_) | LinkError::Closed => true,
            LinkError::Serial(e) => matches!(e.kind(), serialport::ErrorKind::NoDevice),
            LinkError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::NotFound
            ),
        }
    }
}

/// 串口参数
///
/// 固定 8 数据位、1 停止位、无校验、无流控；可配置的只有设备路径、波特率和超时。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    /// 设备路径
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 读写超时（RX 线程的最长阻塞时间）
    pub timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: "/dev/serial0".to_string(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(3),
        }
    }
}

/// 接收半链路
pub trait RxLink: Send {
    /// 读取最多 `buf.len()` 个字节，允许短读
    ///
    /// 超时返回 `Ok(0)`，不视为错误。
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

/// 发送半链路
pub trait TxLink: Send {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

/// 已连接的链路（RX / TX 两半）
pub struct LinkHalves {
    pub rx: Box<dyn RxLink>,
    pub tx: Box<dyn TxLink>,
}

/// 链路连接器
///
/// 每次 `start()` 都会调用一次 `connect()`，因此连接器必须可重复使用。
/// 丢弃 `LinkHalves` 即关闭连接。
pub trait LinkConnector: Send {
    fn connect(&mut self) -> Result<LinkHalves, LinkError>;

    /// 用于日志的链路描述
    fn describe(&self) -> String {
        "unknown".to_string()
    }
}

//! 链路性能指标
//!
//! 原子计数器，用于监控串口链路的健康状态。可以在任何线程读取，不引入锁竞争。

use std::sync::atomic::{AtomicU64, Ordering};

/// 链路实时指标
#[derive(Debug, Default)]
pub struct LinkMetrics {
    /// RX 读到的原始字节数
    pub rx_bytes: AtomicU64,
    /// RX 提取出的完整帧数
    pub rx_frames_total: AtomicU64,
    /// RX 成功解码为状态的帧数
    pub rx_frames_valid: AtomicU64,
    /// RX 解码失败（畸形帧 / payload 长度错误）次数
    pub rx_frame_errors: AtomicU64,
    /// RX 读超时次数（无数据时正常出现）
    pub rx_timeouts: AtomicU64,
    /// TX 成功写出的帧数
    pub tx_frames_total: AtomicU64,
    /// TX 编码失败或写失败次数
    pub tx_errors: AtomicU64,
    /// 链路设备错误次数
    pub device_errors: AtomicU64,
}

impl LinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取指标快照
    ///
    /// 使用 `Ordering::Relaxed`，不同计数器之间可能有微小的时间差。
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
            rx_frames_total: self.rx_frames_total.load(Ordering::Relaxed),
            rx_frames_valid: self.rx_frames_valid.load(Ordering::Relaxed),
            rx_frame_errors: self.rx_frame_errors.load(Ordering::Relaxed),
            rx_timeouts: self.rx_timeouts.load(Ordering::Relaxed),
            tx_frames_total: self.tx_frames_total.load(Ordering::Relaxed),
            tx_errors: self.tx_errors.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
        }
    }
}

/// 指标快照（不可变）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub rx_bytes: u64,
    pub rx_frames_total: u64,
    pub rx_frames_valid: u64,
    pub rx_frame_errors: u64,
    pub rx_timeouts: u64,
    pub tx_frames_total: u64,
    pub tx_errors: u64,
    pub device_errors: u64,
}

impl MetricsSnapshot {
    /// RX 帧错误率（0.0 - 1.0），无帧时为 0
    pub fn rx_error_rate(&self) -> f64 {
        if self.rx_frames_total == 0 {
            0.0
        } else {
            self.rx_frame_errors as f64 / self.rx_frames_total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let metrics = LinkMetrics::new();
        metrics.rx_frames_total.fetch_add(4, Ordering::Relaxed);
        metrics.rx_frame_errors.fetch_add(1, Ordering::Relaxed);
        metrics.tx_frames_total.fetch_add(2, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.rx_frames_total, 4);
        assert_eq!(snapshot.tx_frames_total, 2);
        assert_eq!(snapshot.rx_error_rate(), 0.25);
    }

    #[test]
    fn test_error_rate_without_frames() {
        assert_eq!(MetricsSnapshot::default().rx_error_rate(), 0.0);
    }
}

//! Pipeline IO 循环模块
//!
//! 负责后台 TX / RX 两个线程的主循环：
//! - TX：等待"指令已变更"信号，编码当前指令并写入串口
//! - RX：分段读取串口字节，拆帧、解码状态并发布

use crate::metrics::LinkMetrics;
use crate::state::LinkState;
use crossbeam_channel::Receiver;
use hns_protocol::{ByteQueue, RawStatus, StatusSnapshot, extract_frame, to_hex};
use hns_serial::{RxLink, TxLink};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, trace, warn};

/// Pipeline 配置
///
/// # Example
///
/// ```
/// use hns_driver::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.read_chunk, 8);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// 单次串口读取的最大字节数
    pub read_chunk: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { read_chunk: 8 }
    }
}

/// TX 线程主循环
///
/// # 参数
/// - `tx`: TX 半链路（只写）
/// - `command_signal`: 指令变更信号（容量 1，多次变更合并为一次唤醒）
/// - `shutdown`: 关闭信号，发送端被 drop 时循环退出
/// - `ctx`: 共享状态（读取当前指令）
/// - `is_running`: 运行标志
/// - `metrics`: 性能指标
pub fn tx_loop(
    mut tx: Box<dyn TxLink>,
    command_signal: Receiver<()>,
    shutdown: Receiver<()>,
    ctx: Arc<LinkState>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
) {
    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("TX thread: is_running flag is false, exiting");
            break;
        }

        crossbeam_channel::select! {
            recv(command_signal) -> msg => {
                if msg.is_err() {
                    trace!("TX thread: command signal disconnected");
                    break;
                }
            },
            recv(shutdown) -> _ => {
                trace!("TX thread: shutdown requested");
                break;
            },
        }

        let command = ctx.current_command();
        let frame = match command.to_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("TX thread: cannot encode {:?}: {}", command, e);
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                continue;
            },
        };

        trace!("TX {}", to_hex(&frame));

        match tx.write_all(&frame) {
            Ok(()) => {
                metrics.tx_frames_total.fetch_add(1, Ordering::Relaxed);
            },
            Err(e) => {
                error!("TX thread: failed to write frame: {}", e);
                metrics.tx_errors.fetch_add(1, Ordering::Relaxed);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                if e.is_fatal() {
                    error!("TX thread: Fatal error detected, setting is_running = false");
                    is_running.store(false, Ordering::Release);
                    break;
                }
            },
        }
    }

    trace!("TX thread: loop exited");
}

/// RX 线程主循环
///
/// 每次最多读取 `config.read_chunk` 字节追加到接收队列，然后反复调用
/// `extract_frame` 直到取不出完整帧。接收队列属于本线程，线程退出即清空。
///
/// 畸形帧和长度错误只记录日志并计数，不会中断循环。
pub fn rx_loop(
    mut rx: Box<dyn RxLink>,
    ctx: Arc<LinkState>,
    config: PipelineConfig,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
) {
    #[cfg(feature = "realtime")]
    {
        use thread_priority::*;
        use tracing::info;

        match set_current_thread_priority(ThreadPriority::Max) {
            Ok(_) => {
                info!("RX thread priority set to MAX (realtime)");
            },
            Err(e) => {
                warn!(
                    "Failed to set RX thread priority: {:?}. \
                    On Linux, you may need to run with CAP_SYS_NICE.",
                    e
                );
            },
        }
    }

    let mut queue = ByteQueue::new();
    let mut buf = vec![0u8; config.read_chunk.max(1)];

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("RX thread: is_running flag is false, exiting");
            break;
        }

        let n = match rx.read(&mut buf) {
            Ok(0) => {
                metrics.rx_timeouts.fetch_add(1, Ordering::Relaxed);
                continue;
            },
            Ok(n) => n,
            Err(e) => {
                error!("RX thread: serial read error: {}", e);
                metrics.device_errors.fetch_add(1, Ordering::Relaxed);

                if e.is_fatal() {
                    error!("RX thread: Fatal error detected, setting is_running = false");
                    is_running.store(false, Ordering::Release);
                    break;
                }
                continue;
            },
        };

        metrics.rx_bytes.fetch_add(n as u64, Ordering::Relaxed);
        queue.extend(&buf[..n]);

        while let Some(frame) = extract_frame(&mut queue) {
            metrics.rx_frames_total.fetch_add(1, Ordering::Relaxed);
            trace!("RX {}", to_hex(&frame));

            match RawStatus::from_frame(&frame) {
                Ok(raw) => {
                    metrics.rx_frames_valid.fetch_add(1, Ordering::Relaxed);
                    ctx.publish_status(StatusSnapshot::from(raw));
                },
                Err(e) => {
                    debug!("RX thread: dropping frame {}: {}", to_hex(&frame), e);
                    metrics.rx_frame_errors.fetch_add(1, Ordering::Relaxed);
                },
            }
        }
    }

    trace!("RX thread: loop exited ({} bytes discarded)", queue.len());
}

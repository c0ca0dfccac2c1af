//! 异步帧采集邮箱
//!
//! 采集线程把每一帧（先经过裁剪）同时送到两个地方：
//! - **单槽邮箱**：只保留最新一帧，旧帧未读即被覆盖，供控制线程读取
//! - **工作队列**：无界 MPMC 队列，供投票线程池消费
//!
//! 帧源不可重启，`stop()` 会把它交还给调用方继续使用。

use crate::error::CaptureError;
use crate::image::Image;
use crate::perception::FrameSource;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// 采集线程对每帧执行的裁剪 / 预处理
pub type CropFn = Box<dyn Fn(&Image) -> Image + Send>;

/// 帧采集邮箱
pub struct CaptureMailbox {
    latest_tx: Sender<Image>,
    latest_rx: Receiver<Image>,
    work_tx: Sender<Image>,
    work_rx: Receiver<Image>,
    stop_flag: Arc<AtomicBool>,
    frames_captured: Arc<AtomicU64>,
    thread: Option<JoinHandle<Box<dyn FrameSource>>>,
}

impl Default for CaptureMailbox {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureMailbox {
    pub fn new() -> Self {
        let (latest_tx, latest_rx) = crossbeam_channel::bounded(1);
        let (work_tx, work_rx) = crossbeam_channel::unbounded();
        Self {
            latest_tx,
            latest_rx,
            work_tx,
            work_rx,
            stop_flag: Arc::new(AtomicBool::new(false)),
            frames_captured: Arc::new(AtomicU64::new(0)),
            thread: None,
        }
    }

    /// 工作队列接收端（可任意克隆，多个消费者竞争取帧）
    pub fn work_queue(&self) -> Receiver<Image> {
        self.work_rx.clone()
    }

    /// 启动采集线程
    ///
    /// # 错误
    /// - `CaptureError::AlreadyRunning`: 已在采集中（帧源随错误一起丢弃前会记录日志）
    /// - `CaptureError::Thread`: 无法创建线程
    pub fn start(&mut self, source: Box<dyn FrameSource>, crop: CropFn) -> Result<(), CaptureError> {
        if self.thread.is_some() {
            warn!("Capture already running, dropping the extra frame source");
            return Err(CaptureError::AlreadyRunning);
        }

        self.stop_flag.store(false, Ordering::Release);
        let stop_flag = self.stop_flag.clone();
        let frames_captured = self.frames_captured.clone();
        let latest_tx = self.latest_tx.clone();
        let latest_rx = self.latest_rx.clone();
        let work_tx = self.work_tx.clone();

        let handle = std::thread::Builder::new()
            .name("hns-capture".into())
            .spawn(move || {
                capture_loop(source, crop, stop_flag, frames_captured, latest_tx, latest_rx, work_tx)
            })
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        self.thread = Some(handle);
        info!("Async capture started");
        Ok(())
    }

    /// 读取最新一帧（消费后槽位变空），超时返回 `None`
    pub fn latest(&self, timeout: Duration) -> Option<Image> {
        match self.latest_rx.recv_timeout(timeout) {
            Ok(image) => Some(image),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// 停止采集并等待采集线程退出，返回帧源
    ///
    /// 采集线程在当前 `next_frame()` 返回后才会观察到停止标志。
    pub fn stop(&mut self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let handle = self.thread.take().ok_or(CaptureError::NotRunning)?;
        self.stop_flag.store(true, Ordering::Release);

        let source = handle
            .join()
            .map_err(|_| CaptureError::Thread("capture thread panicked".into()))?;
        info!(
            "Async capture stopped after {} frames",
            self.frames_captured.load(Ordering::Relaxed)
        );
        Ok(source)
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// 已采集的帧数
    pub fn frames_captured(&self) -> u64 {
        self.frames_captured.load(Ordering::Relaxed)
    }
}

impl Drop for CaptureMailbox {
    fn drop(&mut self) {
        if self.thread.is_some()
            && let Err(e) = self.stop()
        {
            warn!("Failed to stop capture: {}", e);
        }
    }
}

fn capture_loop(
    mut source: Box<dyn FrameSource>,
    crop: CropFn,
    stop_flag: Arc<AtomicBool>,
    frames_captured: Arc<AtomicU64>,
    latest_tx: Sender<Image>,
    latest_rx: Receiver<Image>,
    work_tx: Sender<Image>,
) -> Box<dyn FrameSource> {
    while !stop_flag.load(Ordering::Acquire) {
        let image = match source.next_frame() {
            Ok(image) => image,
            Err(e) if e.is_fatal() => {
                warn!("Capture thread: {}, exiting", e);
                break;
            },
            Err(e) => {
                debug!("Capture thread: skipping frame: {}", e);
                continue;
            },
        };

        // 循环内再检查一次，stop() 之后不再投递新帧
        if stop_flag.load(Ordering::Acquire) {
            break;
        }

        let cropped = crop(&image);

        // 单槽覆盖：先取走未读的旧帧，只有本线程写入，所以随后的 try_send 必然成功
        let _ = latest_rx.try_recv();
        let _ = latest_tx.try_send(cropped.clone());
        let _ = work_tx.send(cropped);

        let n = frames_captured.fetch_add(1, Ordering::Relaxed) + 1;
        trace!("Capture thread: frame #{} delivered", n);
    }

    source
}

//! 通信运行时
//!
//! 生命周期：`Stopped → Running → Stopped`。运行中再次 `start()`、
//! 停止后再次 `stop()` 都会被忽略。

use crate::error::DriverError;
use crate::hooks::{ChannelListener, StatusListener};
use crate::metrics::{LinkMetrics, MetricsSnapshot};
use crate::pipeline::{PipelineConfig, rx_loop, tx_loop};
use crate::state::LinkState;
use crossbeam_channel::{Receiver, Sender};
use hns_protocol::{MovementCommand, StatusSnapshot};
use hns_serial::LinkConnector;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{error, info, warn};

/// 串口通信运行时
///
/// 持有 TX / RX 两个后台线程和共享的 [`LinkState`]。
///
/// # Example
///
/// ```no_run
/// use hns_driver::RuntimeBuilder;
///
/// let mut runtime = RuntimeBuilder::new().port("/dev/serial0").build();
/// runtime.start().unwrap();
/// runtime.set_target_speed(60);
/// println!("{:?}", runtime.get_status());
/// runtime.stop().unwrap();
/// ```
pub struct CommunicationRuntime {
    connector: Box<dyn LinkConnector>,
    config: PipelineConfig,
    ctx: Arc<LinkState>,
    is_running: Arc<AtomicBool>,
    metrics: Arc<LinkMetrics>,
    /// 指令变更信号（容量 1，未消费时重复信号合并）
    command_tx: Sender<()>,
    command_rx: Receiver<()>,
    /// drop 即通知 TX 线程退出
    shutdown_tx: Option<Sender<()>>,
    rx_thread: Option<JoinHandle<()>>,
    tx_thread: Option<JoinHandle<()>>,
}

impl CommunicationRuntime {
    /// 创建运行时（不连接，`start()` 时才打开链路）
    pub fn new(connector: Box<dyn LinkConnector>, config: PipelineConfig) -> Self {
        let (command_tx, command_rx) = crossbeam_channel::bounded(1);
        Self {
            connector,
            config,
            ctx: Arc::new(LinkState::new()),
            is_running: Arc::new(AtomicBool::new(false)),
            metrics: Arc::new(LinkMetrics::new()),
            command_tx,
            command_rx,
            shutdown_tx: None,
            rx_thread: None,
            tx_thread: None,
        }
    }

    /// 打开链路并启动 TX / RX 线程
    ///
    /// 停止期间修改过的指令会在启动后立即下发。
    ///
    /// # 错误
    /// - `DriverError::Link`: 设备不存在或无法打开（致命）
    /// - `DriverError::IoThread`: 无法创建线程
    pub fn start(&mut self) -> Result<(), DriverError> {
        if self.is_running() {
            warn!("Communication runtime already running, ignoring start()");
            return Ok(());
        }
        // 线程可能因致命错误自行退出，先回收
        self.join_threads()?;

        let halves = self.connector.connect()?;
        info!("Serial link opened: {}", self.connector.describe());

        self.is_running.store(true, Ordering::Release);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);

        let ctx = self.ctx.clone();
        let config = self.config.clone();
        let is_running = self.is_running.clone();
        let metrics = self.metrics.clone();
        let rx_thread = std::thread::Builder::new()
            .name("hns-rx".into())
            .spawn(move || rx_loop(halves.rx, ctx, config, is_running, metrics));
        let rx_thread = match rx_thread {
            Ok(handle) => handle,
            Err(e) => {
                self.is_running.store(false, Ordering::Release);
                return Err(DriverError::IoThread(e.to_string()));
            },
        };
        self.rx_thread = Some(rx_thread);

        let ctx = self.ctx.clone();
        let command_rx = self.command_rx.clone();
        let is_running = self.is_running.clone();
        let metrics = self.metrics.clone();
        let tx_thread = std::thread::Builder::new().name("hns-tx".into()).spawn(move || {
            tx_loop(halves.tx, command_rx, shutdown_rx, ctx, is_running, metrics)
        });
        match tx_thread {
            Ok(handle) => self.tx_thread = Some(handle),
            Err(e) => {
                self.is_running.store(false, Ordering::Release);
                // RX 线程会在下一次读超时后退出
                let _ = self.join_threads();
                return Err(DriverError::IoThread(e.to_string()));
            },
        }
        self.shutdown_tx = Some(shutdown_tx);

        Ok(())
    }

    /// 通知两个线程退出并等待其结束，随后关闭链路、清空接收队列
    ///
    /// RX 线程在当前读操作返回后才会退出，最长阻塞一个链路超时周期。
    pub fn stop(&mut self) -> Result<(), DriverError> {
        if self.rx_thread.is_none() && self.tx_thread.is_none() {
            return Ok(());
        }

        self.is_running.store(false, Ordering::Release);
        self.join_threads()?;
        info!("Communication runtime stopped");
        Ok(())
    }

    fn join_threads(&mut self) -> Result<(), DriverError> {
        self.shutdown_tx.take();

        let mut result = Ok(());
        if let Some(handle) = self.tx_thread.take()
            && handle.join().is_err()
        {
            error!("TX thread panicked");
            result = Err(DriverError::IoThread("TX thread panicked".into()));
        }
        if let Some(handle) = self.rx_thread.take()
            && handle.join().is_err()
        {
            error!("RX thread panicked");
            result = Err(DriverError::IoThread("RX thread panicked".into()));
        }
        result
    }

    /// 运行标志（致命链路错误后自动变为 `false`）
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::Acquire)
    }

    /// 设置目标速度百分比（0-100，越界截断），距离保持不变
    pub fn set_target_speed(&self, percent: i32) {
        let command = self.ctx.update_command(|c| c.with_speed_percent(percent));
        info!("Target speed set to {}% ({:?})", percent, command);
        self.notify_sender();
    }

    /// 设置剩余行驶距离（毫米），速度保持不变
    pub fn set_distance_to_go(&self, distance_mm: f64) {
        let command = self.ctx.update_command(|c| c.with_distance_mm(distance_mm));
        info!("Distance to go set to {:.1} mm ({:?})", distance_mm, command);
        self.notify_sender();
    }

    fn notify_sender(&self) {
        // 容量 1：已有未消费信号时无需再发，TX 线程读取的总是最新指令
        let _ = self.command_tx.try_send(());
    }

    /// 当前指令
    pub fn command(&self) -> MovementCommand {
        self.ctx.current_command()
    }

    /// 最新状态（无锁，不阻塞）
    pub fn get_status(&self) -> StatusSnapshot {
        self.ctx.current_status()
    }

    /// 注册状态监听器
    ///
    /// 监听器在 RX 线程上同步调用，**禁止阻塞**。
    pub fn register_status_handler(&self, handler: Arc<dyn StatusListener>) {
        self.ctx.add_listener(handler);
    }

    /// 以有界通道订阅状态更新，通道满时丢弃新状态
    pub fn subscribe_status(&self, capacity: usize) -> Receiver<StatusSnapshot> {
        let (listener, receiver) = ChannelListener::new(capacity);
        self.ctx.add_listener(Arc::new(listener));
        receiver
    }

    /// 等待满足条件的状态
    ///
    /// # 错误
    /// - `DriverError::NotRunning`: 运行时未启动
    /// - `DriverError::Timeout`: 超时前未观察到满足条件的状态
    pub fn wait_for_status(
        &self,
        predicate: impl FnMut(&StatusSnapshot) -> bool,
        timeout: Duration,
    ) -> Result<StatusSnapshot, DriverError> {
        if !self.is_running() {
            return Err(DriverError::NotRunning);
        }
        self.ctx.wait_for(predicate, timeout).ok_or(DriverError::Timeout)
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// 链路描述（用于日志）
    pub fn describe(&self) -> String {
        self.connector.describe()
    }
}

impl Drop for CommunicationRuntime {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            error!("Failed to stop communication runtime: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hns_serial::mock::{SimulatedController, SimulatorConfig};
    use std::time::Instant;

    fn fast_controller() -> SimulatedController {
        SimulatedController::with_config(SimulatorConfig {
            status_interval: Duration::from_millis(5),
            cycles_per_report: 9,
        })
    }

    fn runtime_for(controller: &SimulatedController) -> CommunicationRuntime {
        CommunicationRuntime::new(Box::new(controller.clone()), PipelineConfig::default())
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn test_start_fails_when_device_missing() {
        let controller = fast_controller();
        controller.set_available(false);
        let mut runtime = runtime_for(&controller);

        let result = runtime.start();
        assert!(matches!(result, Err(DriverError::Link(_))));
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_start_and_stop_are_idempotent() {
        let controller = fast_controller();
        let mut runtime = runtime_for(&controller);

        runtime.start().unwrap();
        runtime.start().unwrap();
        assert_eq!(controller.connect_count(), 1);

        runtime.stop().unwrap();
        runtime.stop().unwrap();
        assert!(!runtime.is_running());
    }

    #[test]
    fn test_speed_and_distance_are_independent() {
        let controller = fast_controller();
        let mut runtime = runtime_for(&controller);
        runtime.start().unwrap();

        runtime.set_distance_to_go(84.5);
        runtime.set_target_speed(60);

        let expected = MovementCommand {
            speed: 153,
            distance_ticks: 10,
        };
        assert_eq!(runtime.command(), expected);
        assert!(wait_until(|| controller.last_command() == Some(expected)));
        runtime.stop().unwrap();
    }

    #[test]
    fn test_wait_for_status_requires_running() {
        let controller = fast_controller();
        let runtime = runtime_for(&controller);
        let result = runtime.wait_for_status(|_| true, Duration::from_millis(10));
        assert!(matches!(result, Err(DriverError::NotRunning)));
    }

    #[test]
    fn test_disconnect_stops_loops() {
        let controller = fast_controller();
        let mut runtime = runtime_for(&controller);
        runtime.start().unwrap();

        controller.disconnect();
        assert!(wait_until(|| !runtime.is_running()));

        // 致命错误后可以重新启动
        runtime.start().unwrap();
        assert!(runtime.is_running());
        assert_eq!(controller.connect_count(), 2);
    }
}

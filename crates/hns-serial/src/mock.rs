//! 模拟电机控制器
//!
//! 进程内实现电机控制器一侧的协议：
//! - 接收下行指令帧，记录所有解码成功的 `MovementCommand`
//! - 当前速度立即跟随指令速度（无加减速过程）
//! - 按固定周期上报状态帧，RX 端按调用方缓冲区大小分段读出（模拟短读）
//!
//! # 示例
//!
//! ```
//! use hns_serial::LinkConnector;
//! use hns_serial::mock::SimulatedController;
//!
//! let controller = SimulatedController::new();
//! let mut connector = controller.clone();
//! let mut halves = connector.connect().unwrap();
//!
//! let mut buf = [0u8; 8];
//! let n = halves.rx.read(&mut buf).unwrap();
//! assert!(n > 0);
//! ```

use crate::{LinkConnector, LinkError, LinkHalves, RxLink, TxLink};
use hns_protocol::{ByteQueue, CARGO_PICKUP_BIT, MovementCommand, RawStatus, decode, extract_frame};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// 模拟控制器参数
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// 状态帧上报周期
    pub status_interval: Duration,
    /// 行驶中每个上报周期增加的轮圈原始计数
    pub cycles_per_report: u16,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            status_interval: Duration::from_millis(20),
            cycles_per_report: 3,
        }
    }
}

#[derive(Default)]
struct SimState {
    status: RawStatus,
    commands: Vec<MovementCommand>,
    /// 控制器收到、尚未组帧的字节
    inbound: ByteQueue,
    /// 待读出的状态帧字节
    outbound: VecDeque<u8>,
    /// 测试注入的原始字节（优先读出）
    injected: VecDeque<u8>,
}

struct Shared {
    config: SimulatorConfig,
    state: Mutex<SimState>,
    available: AtomicBool,
    closed: AtomicBool,
    connects: AtomicUsize,
}

/// 模拟电机控制器（可克隆，克隆体共享同一状态）
#[derive(Clone)]
pub struct SimulatedController {
    shared: Arc<Shared>,
}

impl Default for SimulatedController {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedController {
    pub fn new() -> Self {
        Self::with_config(SimulatorConfig::default())
    }

    pub fn with_config(config: SimulatorConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(SimState::default()),
                available: AtomicBool::new(true),
                closed: AtomicBool::new(false),
                connects: AtomicUsize::new(0),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        // 模拟器内部锁只在本模块中持有，中毒时沿用内部数据
        self.shared.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 吊臂已装载货物：置位状态字节 Bit 0
    pub fn load_cargo(&self) {
        self.state().status.status_byte |= CARGO_PICKUP_BIT;
        debug!("Simulator: cargo loaded");
    }

    /// 设备是否可连接（`false` 时 `connect()` 返回 `LinkError::NotFound`）
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::Release);
    }

    /// 模拟线缆断开：之后的读写返回 `LinkError::Closed`，直到下次 `connect()`
    pub fn disconnect(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    /// 注入原始字节（可以是垃圾数据或畸形帧）
    pub fn inject_bytes(&self, bytes: &[u8]) {
        self.state().injected.extend(bytes.iter().copied());
    }

    /// 已收到的全部指令（按接收顺序）
    pub fn commands(&self) -> Vec<MovementCommand> {
        self.state().commands.clone()
    }

    pub fn last_command(&self) -> Option<MovementCommand> {
        self.state().commands.last().copied()
    }

    /// 当前上报的原始状态
    pub fn status(&self) -> RawStatus {
        self.state().status
    }

    /// `connect()` 成功的次数
    pub fn connect_count(&self) -> usize {
        self.shared.connects.load(Ordering::Acquire)
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn receive_bytes(&self, bytes: &[u8]) {
        let mut state = self.state();
        state.inbound.extend(bytes.iter().copied());

        while let Some(frame) = extract_frame(&mut state.inbound) {
            match decode(&frame).and_then(|payload| MovementCommand::from_payload(&payload)) {
                Ok(command) => {
                    state.status.speed = command.speed;
                    state.commands.push(command);
                },
                Err(e) => warn!("Simulator: dropping malformed command frame: {}", e),
            }
        }
    }

    fn next_status_frame(&self) {
        let mut state = self.state();
        if state.status.speed > 0 {
            state.status.wheel_cycles =
                state.status.wheel_cycles.wrapping_add(self.shared.config.cycles_per_report);
        }
        let frame = state.status.to_frame();
        state.outbound.extend(frame);
    }
}

impl LinkConnector for SimulatedController {
    fn connect(&mut self) -> Result<LinkHalves, LinkError> {
        if !self.shared.available.load(Ordering::Acquire) {
            return Err(LinkError::NotFound("simulated controller".to_string()));
        }
        self.shared.closed.store(false, Ordering::Release);
        self.shared.connects.fetch_add(1, Ordering::AcqRel);

        Ok(LinkHalves {
            rx: Box::new(SimulatedRx {
                controller: self.clone(),
            }),
            tx: Box::new(SimulatedTx {
                controller: self.clone(),
            }),
        })
    }

    fn describe(&self) -> String {
        "simulated".to_string()
    }
}

struct SimulatedRx {
    controller: SimulatedController,
}

impl RxLink for SimulatedRx {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        if self.controller.is_closed() {
            return Err(LinkError::Closed);
        }

        {
            let mut state = self.controller.state();
            if !state.injected.is_empty() {
                let n = buf.len().min(state.injected.len());
                for (slot, byte) in buf.iter_mut().zip(state.injected.drain(..n)) {
                    *slot = byte;
                }
                return Ok(n);
            }
        }

        if self.controller.state().outbound.is_empty() {
            std::thread::sleep(self.controller.shared.config.status_interval);
            self.controller.next_status_frame();
        }

        let mut state = self.controller.state();
        let n = buf.len().min(state.outbound.len());
        for (slot, byte) in buf.iter_mut().zip(state.outbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

struct SimulatedTx {
    controller: SimulatedController,
}

impl TxLink for SimulatedTx {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.controller.is_closed() {
            return Err(LinkError::Closed);
        }
        self.controller.receive_bytes(bytes);
        Ok(())
    }
}

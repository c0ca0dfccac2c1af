//! 状态监听系统
//!
//! RX 线程每成功解码一帧状态，就按注册顺序同步调用所有监听器。
//!
//! # 约束
//!
//! - 监听器在 RX 线程上内联执行，执行期间后续串口读取被推迟，**禁止阻塞**
//! - 需要做耗时处理时，使用 [`ChannelListener`] 转发到其他线程
//!
//! # 使用示例
//!
//! ```rust
//! use hns_driver::hooks::{ListenerRegistry, StatusListener};
//! use hns_protocol::StatusSnapshot;
//! use std::sync::Arc;
//!
//! let mut registry = ListenerRegistry::new();
//! registry.add(Arc::new(|status: &StatusSnapshot| {
//!     let _ = status.cargo_picked();
//! }));
//!
//! registry.notify_all(&StatusSnapshot::default());
//! ```

use crossbeam_channel::{Receiver, Sender, TrySendError};
use hns_protocol::StatusSnapshot;
use std::sync::Arc;
use tracing::trace;

/// 状态监听器
///
/// 闭包 `Fn(&StatusSnapshot) + Send + Sync` 自动实现此 trait。
pub trait StatusListener: Send + Sync {
    /// 每次状态更新后调用（RX 线程上下文）
    fn on_status(&self, status: &StatusSnapshot);
}

impl<F> StatusListener for F
where
    F: Fn(&StatusSnapshot) + Send + Sync,
{
    fn on_status(&self, status: &StatusSnapshot) {
        self(status)
    }
}

/// 监听器列表
///
/// 本身不是线程安全的，由 `LinkState` 通过 `RwLock` 保护。
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Vec<Arc<dyn StatusListener>>,
}

impl ListenerRegistry {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn add(&mut self, listener: Arc<dyn StatusListener>) {
        self.listeners.push(listener);
    }

    /// 按注册顺序通知所有监听器
    pub fn notify_all(&self, status: &StatusSnapshot) {
        for listener in self.listeners.iter() {
            listener.on_status(status);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

/// 通道转发监听器
///
/// 用 `try_send` 把状态转发到有界通道，通道满时丢弃（不阻塞 RX 线程）。
/// 接收端断开后自动变为空操作。
pub struct ChannelListener {
    sender: Sender<StatusSnapshot>,
}

impl ChannelListener {
    /// 创建监听器及对应的接收端
    pub fn new(capacity: usize) -> (Self, Receiver<StatusSnapshot>) {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl StatusListener for ChannelListener {
    fn on_status(&self, status: &StatusSnapshot) {
        match self.sender.try_send(*status) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {},
            Err(TrySendError::Full(_)) => {
                trace!("Status subscriber lagging, dropping update");
            },
        }
    }
}

//! 链路共享状态
//!
//! 指令（由控制线程写）与状态（由 RX 线程写）是两个互相独立的字段，
//! 各自用 `ArcSwap` 保存，不需要跨字段事务。

use crate::hooks::{ListenerRegistry, StatusListener};
use arc_swap::ArcSwap;
use hns_protocol::{MovementCommand, StatusSnapshot};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

/// 运行时共享状态
pub struct LinkState {
    /// 当前下发的运动指令
    pub command: ArcSwap<MovementCommand>,
    /// 最新解码的状态
    pub status: ArcSwap<StatusSnapshot>,
    /// 状态监听器（RX 线程读，用户线程写）
    pub listeners: RwLock<ListenerRegistry>,
    /// 状态更新计数，配合 `status_changed` 实现带超时的等待
    status_seq: Mutex<u64>,
    status_changed: Condvar,
}

impl Default for LinkState {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkState {
    pub fn new() -> Self {
        Self {
            command: ArcSwap::from_pointee(MovementCommand::default()),
            status: ArcSwap::from_pointee(StatusSnapshot::default()),
            listeners: RwLock::new(ListenerRegistry::new()),
            status_seq: Mutex::new(0),
            status_changed: Condvar::new(),
        }
    }

    pub fn current_command(&self) -> MovementCommand {
        **self.command.load()
    }

    pub fn current_status(&self) -> StatusSnapshot {
        **self.status.load()
    }

    /// 原子地修改当前指令，返回修改后的值
    pub fn update_command(&self, f: impl Fn(MovementCommand) -> MovementCommand) -> MovementCommand {
        let previous = self.command.rcu(|current| f(**current));
        f(*previous)
    }

    /// 发布新状态（仅 RX 线程调用）
    ///
    /// 顺序：替换状态 → 按注册顺序通知监听器 → 唤醒 `wait_for` 等待者。
    /// 使用阻塞的 `read()` 而不是 `try_read()`，保证监听器不会漏掉任何一帧。
    pub fn publish_status(&self, status: StatusSnapshot) {
        self.status.store(Arc::new(status));

        let listeners = self.listeners.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        listeners.notify_all(&status);
        drop(listeners);

        *self.seq() += 1;
        self.status_changed.notify_all();
    }

    pub fn add_listener(&self, listener: Arc<dyn StatusListener>) {
        self.listeners
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .add(listener);
    }

    /// 等待满足条件的状态，超时返回 `None`
    ///
    /// 先检查当前状态；之后每次状态更新时重新检查。
    pub fn wait_for(
        &self,
        mut predicate: impl FnMut(&StatusSnapshot) -> bool,
        timeout: Duration,
    ) -> Option<StatusSnapshot> {
        let deadline = Instant::now() + timeout;
        let mut seq = self.seq();

        loop {
            let status = self.current_status();
            if predicate(&status) {
                return Some(status);
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }

            let observed = *seq;
            let (guard, _) = self
                .status_changed
                .wait_timeout_while(seq, deadline - now, |current| *current == observed)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            seq = guard;
        }
    }

    fn seq(&self) -> MutexGuard<'_, u64> {
        self.status_seq.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

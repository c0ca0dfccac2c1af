//! 吊臂装货锁存
//!
//! 状态监听器在 RX 线程上 `set()`，控制线程在 `wait()` 上无限期阻塞。
//! 置位后保持，不会复位。

use std::sync::{Condvar, Mutex, MutexGuard};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LatchState {
    Waiting,
    Picked,
    Cancelled,
}

/// 等待结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CargoWait {
    Picked,
    /// 等待被 `cancel()` 中断
    Cancelled,
}

#[derive(Debug)]
pub struct CargoLatch {
    state: Mutex<LatchState>,
    changed: Condvar,
}

impl Default for CargoLatch {
    fn default() -> Self {
        Self::new()
    }
}

impl CargoLatch {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(LatchState::Waiting),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 标记货物已装载（重复调用无副作用）
    pub fn set(&self) {
        let mut state = self.lock();
        if *state == LatchState::Waiting {
            *state = LatchState::Picked;
            info!("Cargo has been picked up");
            self.changed.notify_all();
        }
    }

    /// 中断所有等待者
    pub fn cancel(&self) {
        let mut state = self.lock();
        if *state == LatchState::Waiting {
            *state = LatchState::Cancelled;
            self.changed.notify_all();
        }
    }

    pub fn is_set(&self) -> bool {
        *self.lock() == LatchState::Picked
    }

    /// 无限期等待装货或取消
    pub fn wait(&self) -> CargoWait {
        debug!("Waiting for the cargo to be picked up");
        let state = self
            .changed
            .wait_while(self.lock(), |state| *state == LatchState::Waiting)
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *state {
            LatchState::Picked => CargoWait::Picked,
            _ => CargoWait::Cancelled,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_wait_returns_after_set() {
        let latch = Arc::new(CargoLatch::new());
        let setter = latch.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            setter.set();
        });

        assert_eq!(latch.wait(), CargoWait::Picked);
        assert!(latch.is_set());
        handle.join().unwrap();
    }

    #[test]
    fn test_set_is_sticky() {
        let latch = CargoLatch::new();
        latch.set();
        latch.cancel();
        assert_eq!(latch.wait(), CargoWait::Picked);
    }

    #[test]
    fn test_cancel_wakes_waiter() {
        let latch = Arc::new(CargoLatch::new());
        let canceller = latch.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        assert_eq!(latch.wait(), CargoWait::Cancelled);
        assert!(!latch.is_set());
        handle.join().unwrap();
    }
}

//! 比赛流程阶段
//!
//! 线性推进，不可回退：
//! `Idle → AwaitingCargo → LapCounting → Approaching → Homing → Done`

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum Phase {
    #[default]
    Idle = 0,
    /// 等待吊臂装货
    AwaitingCargo = 1,
    /// 全速计圈，同时后台投票
    LapCounting = 2,
    /// 低速寻找目标停车信号
    Approaching = 3,
    /// 按估计距离精确停车
    Homing = 4,
    Done = 5,
}

impl Phase {
    /// 无效值视为 `Idle`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::AwaitingCargo,
            2 => Self::LapCounting,
            3 => Self::Approaching,
            4 => Self::Homing,
            5 => Self::Done,
            _ => Self::Idle,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 原子阶段（控制线程写，其他线程读）
#[derive(Debug, Default)]
pub struct AtomicPhase {
    inner: AtomicU8,
}

impl AtomicPhase {
    pub fn new(phase: Phase) -> Self {
        Self {
            inner: AtomicU8::new(phase.as_u8()),
        }
    }

    pub fn get(&self) -> Phase {
        Phase::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, phase: Phase) {
        self.inner.store(phase.as_u8(), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_and_order() {
        for phase in [
            Phase::Idle,
            Phase::AwaitingCargo,
            Phase::LapCounting,
            Phase::Approaching,
            Phase::Homing,
            Phase::Done,
        ] {
            assert_eq!(Phase::from_u8(phase.as_u8()), phase);
        }
        assert_eq!(Phase::from_u8(42), Phase::Idle);
        assert!(Phase::LapCounting < Phase::Approaching);
    }

    #[test]
    fn test_atomic_phase() {
        let phase = AtomicPhase::new(Phase::Idle);
        phase.set(Phase::Homing);
        assert_eq!(phase.get(), Phase::Homing);
        assert_eq!(phase.get().to_string(), "Homing");
    }
}

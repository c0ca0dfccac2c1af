//! 起点信号去抖计圈
//!
//! 车辆驶过起点信号时会在连续多帧中检测到它。距离上一次检测（无论是否计圈）
//! 不超过去抖窗口的检测只刷新时间戳，不计圈；因此持续可见的信号只算一圈。

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct LapCounter {
    window: Duration,
    last_detection: Instant,
    laps: u32,
}

impl LapCounter {
    /// `started_at` 作为"上一次检测"时间：刚开始计圈时窗口内的检测同样被忽略
    pub fn new(window: Duration, started_at: Instant) -> Self {
        Self {
            window,
            last_detection: started_at,
            laps: 0,
        }
    }

    /// 记录一次起点信号检测，计圈时返回 `true`
    pub fn record(&mut self, now: Instant) -> bool {
        let within_window = now.saturating_duration_since(self.last_detection) <= self.window;
        self.last_detection = now;
        if within_window {
            return false;
        }
        self.laps += 1;
        true
    }

    pub fn laps(&self) -> u32 {
        self.laps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    #[test]
    fn test_detections_close_together_count_once() {
        let t0 = Instant::now();
        let mut counter = LapCounter::new(WINDOW, t0);

        assert!(counter.record(t0 + Duration::from_secs(1)));
        assert!(!counter.record(t0 + Duration::from_millis(1200)));
        assert_eq!(counter.laps(), 1);
    }

    #[test]
    fn test_detections_far_apart_count_twice() {
        let t0 = Instant::now();
        let mut counter = LapCounter::new(WINDOW, t0);

        assert!(counter.record(t0 + Duration::from_secs(1)));
        assert!(counter.record(t0 + Duration::from_millis(1600)));
        assert_eq!(counter.laps(), 2);
    }

    #[test]
    fn test_window_slides_with_each_detection() {
        let t0 = Instant::now();
        let mut counter = LapCounter::new(WINDOW, t0);
        assert!(counter.record(t0 + Duration::from_secs(1)));

        // 每 0.3 s 一次检测，窗口不断被刷新，始终不计圈
        for i in 1..=5 {
            assert!(!counter.record(t0 + Duration::from_secs(1) + Duration::from_millis(300 * i)));
        }
        assert_eq!(counter.laps(), 1);
    }

    #[test]
    fn test_detection_right_after_start_is_ignored() {
        let t0 = Instant::now();
        let mut counter = LapCounter::new(WINDOW, t0);
        assert!(!counter.record(t0 + Duration::from_millis(100)));
        assert_eq!(counter.laps(), 0);
    }
}

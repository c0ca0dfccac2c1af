//! 脚本化赛道
//!
//! 没有摄像头时用合成帧模拟一次比赛：若干圈的起点信号和信息信号、
//! 一个干扰停车信号、目标停车信号，以及归位时的停车信号。

use hns_vision::mock::{PhasedSource, signal_frame};
use hns_vision::{Image, SignalKind};
use std::time::Duration;

/// 赛道脚本参数
#[derive(Debug, Clone)]
pub struct TrackScript {
    /// 信息信号上的数字
    pub digit: u8,
    pub laps: u32,
    /// 帧间隔（模拟帧率）
    pub frame_interval: Duration,
    /// 起点信号去抖窗口，两次起点信号之间至少隔开这么久
    pub debounce: Duration,
}

impl TrackScript {
    /// 干扰数字（投票中的少数派，也是第一个停车信号上的数字）
    pub fn decoy(&self) -> u8 {
        (self.digit + 1) % 10
    }

    fn info(digit: u8) -> Image {
        signal_frame(Some(SignalKind::Info), Some(digit))
    }

    fn stop(digit: Option<u8>) -> Image {
        signal_frame(Some(SignalKind::Stop), digit)
    }

    /// 两次起点信号之间的帧数
    fn gap_frames(&self) -> usize {
        let interval = self.frame_interval.as_millis().max(1);
        (self.debounce.as_millis() / interval) as usize + 3
    }

    /// 三段画面：计圈、接近、归位（每次 `reset()` 切换一段）
    pub fn segments(&self) -> Vec<Vec<Image>> {
        let start = signal_frame(Some(SignalKind::Start), None);
        let mut laps = Vec::new();
        for _ in 0..self.laps {
            for i in 0..self.gap_frames() {
                // 每四帧混入一帧干扰数字
                let digit = if i % 4 == 3 { self.decoy() } else { self.digit };
                laps.push(Self::info(digit));
            }
            laps.extend([start.clone(), start.clone()]);
        }
        laps.push(Self::info(self.digit));

        let approach = vec![
            signal_frame(None, None),
            Self::stop(Some(self.decoy())),
            Self::stop(None),
            Self::stop(Some(self.digit)),
        ];
        let homing = vec![Self::stop(Some(self.digit))];

        vec![laps, approach, homing]
    }

    pub fn into_source(self) -> PhasedSource {
        PhasedSource::new(self.segments(), self.frame_interval)
    }
}

//! 声音播报
//!
//! 投票得到的停车数字用蜂鸣次数播报：先一声低音引导，再按数字响 N 声。
//! 蜂鸣器硬件通过 [`ToneOutput`] 接入，默认的 [`LogTone`] 只写日志。

use std::time::Duration;
use tracing::info;

/// 播报接口（调用方在独立线程上调用，可以阻塞）
pub trait AudioAnnouncer: Send + Sync {
    /// 播报一个数字
    fn announce(&self, digit: u8);

    /// 单个提示音
    fn cue(&self, tone_hz: u32, duration: Duration);
}

/// 蜂鸣器输出（阻塞至声音结束）
pub trait ToneOutput: Send + Sync {
    /// `tone_hz == 0` 表示静音 `duration`
    fn tone(&self, tone_hz: u32, duration: Duration);
}

/// 只记录日志的蜂鸣器
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTone;

impl ToneOutput for LogTone {
    fn tone(&self, tone_hz: u32, duration: Duration) {
        info!(target: "hns::sound", "beep {} Hz for {:?}", tone_hz, duration);
    }
}

/// 蜂鸣节奏
#[derive(Debug, Clone, PartialEq)]
pub struct BeepPattern {
    /// 数字蜂鸣音高
    pub pitch_hz: u32,
    /// 引导音比数字蜂鸣低多少 Hz
    pub lead_offset_hz: u32,
    /// 单声时长
    pub beep: Duration,
    /// 两声之间的间隔
    pub interval: Duration,
}

impl Default for BeepPattern {
    fn default() -> Self {
        Self {
            pitch_hz: 1000,
            lead_offset_hz: 300,
            beep: Duration::from_millis(200),
            interval: Duration::from_millis(300),
        }
    }
}

/// 蜂鸣播报器
pub struct BeepAnnouncer<T: ToneOutput> {
    output: T,
    pattern: BeepPattern,
}

impl<T: ToneOutput> BeepAnnouncer<T> {
    pub fn new(output: T, pattern: BeepPattern) -> Self {
        Self { output, pattern }
    }

    pub fn output(&self) -> &T {
        &self.output
    }

    fn pause(&self) {
        if !self.pattern.interval.is_zero() {
            std::thread::sleep(self.pattern.interval);
        }
    }
}

impl<T: ToneOutput> AudioAnnouncer for BeepAnnouncer<T> {
    fn announce(&self, digit: u8) {
        info!("Announcing digit {}", digit);
        let lead = self.pattern.pitch_hz.saturating_sub(self.pattern.lead_offset_hz);
        self.output.tone(lead, self.pattern.beep);
        self.pause();

        for _ in 0..digit {
            self.output.tone(self.pattern.pitch_hz, self.pattern.beep);
            self.pause();
        }
    }

    fn cue(&self, tone_hz: u32, duration: Duration) {
        self.output.tone(tone_hz, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        tones: Mutex<Vec<(u32, Duration)>>,
    }

    impl ToneOutput for Recorder {
        fn tone(&self, tone_hz: u32, duration: Duration) {
            self.tones.lock().unwrap().push((tone_hz, duration));
        }
    }

    fn pattern() -> BeepPattern {
        BeepPattern {
            pitch_hz: 1200,
            lead_offset_hz: 300,
            beep: Duration::from_millis(50),
            interval: Duration::ZERO,
        }
    }

    #[test]
    fn test_announce_pattern() {
        let announcer = BeepAnnouncer::new(Recorder::default(), pattern());
        announcer.announce(3);

        let tones = announcer.output().tones.lock().unwrap().clone();
        let beep = Duration::from_millis(50);
        assert_eq!(
            tones,
            vec![(900, beep), (1200, beep), (1200, beep), (1200, beep)]
        );
    }

    #[test]
    fn test_announce_zero_plays_lead_only() {
        let announcer = BeepAnnouncer::new(Recorder::default(), pattern());
        announcer.announce(0);
        assert_eq!(announcer.output().tones.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_cue() {
        let announcer = BeepAnnouncer::new(Recorder::default(), pattern());
        announcer.cue(3000, Duration::from_secs(1));
        assert_eq!(
            *announcer.output().tones.lock().unwrap(),
            vec![(3000, Duration::from_secs(1))]
        );
    }

    #[test]
    fn test_low_pitch_saturates() {
        let announcer = BeepAnnouncer::new(
            Recorder::default(),
            BeepPattern {
                pitch_hz: 100,
                ..pattern()
            },
        );
        announcer.announce(1);
        assert_eq!(announcer.output().tones.lock().unwrap()[0].0, 0);
    }
}

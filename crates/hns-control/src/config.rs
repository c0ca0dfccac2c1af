//! # 运行配置
//!
//! TOML 配置文件，每个小节都有默认值，缺省的小节和字段使用默认值：
//!
//! ```toml
//! [link]
//! port = "/dev/serial0"
//! baud_rate = 115200
//!
//! [drive]
//! full_speed = 60
//! stop_speed = 20
//!
//! [voting]
//! workers = 4
//! ```
//!
//! 加载后立即校验，非法值以 `ConfigError::Invalid` 报告（字段名为 `小节.字段`）。

use crate::audio::BeepPattern;
use crate::error::ConfigError;
use crate::sequencer::SequencerSettings;
use hns_serial::LinkConfig;
use hns_vision::{LinearDistanceEstimator, SignalKind, VotingConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 完整配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HnsConfig {
    pub link: LinkSection,
    pub drive: DriveSection,
    pub capture: CaptureSection,
    pub voting: VotingSection,
    pub sequencer: SequencerSection,
    pub distance: DistanceSection,
    pub sound: SoundSection,
}

/// 串口
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSection {
    pub port: String,
    pub baud_rate: u32,
    /// 读写超时（毫秒）
    pub timeout_ms: u64,
}

impl Default for LinkSection {
    fn default() -> Self {
        let link = LinkConfig::default();
        Self {
            port: link.port,
            baud_rate: link.baud_rate,
            timeout_ms: link.timeout.as_millis() as u64,
        }
    }
}

/// 行驶速度（满量程百分比）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveSection {
    /// 计圈阶段速度
    pub full_speed: i32,
    /// 寻找停车信号时的低速
    pub stop_speed: i32,
}

impl Default for DriveSection {
    fn default() -> Self {
        Self {
            full_speed: 60,
            stop_speed: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureSection {
    /// 计圈时等待最新帧的超时（毫秒）
    pub latest_timeout_ms: u64,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            latest_timeout_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VotingSection {
    pub workers: usize,
    /// 工作线程取帧超时（毫秒）
    pub poll_timeout_ms: u64,
}

impl Default for VotingSection {
    fn default() -> Self {
        Self {
            workers: 4,
            poll_timeout_ms: 5000,
        }
    }
}

/// 流程节奏
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSection {
    /// 需要完成的圈数
    pub laps: u32,
    /// 起点信号去抖窗口（毫秒）
    pub debounce_ms: u64,
    /// 停车和下发距离后的稳定等待（毫秒）
    pub settle_ms: u64,
    /// 到达终点后、提示音之前的等待（毫秒）
    pub final_wait_ms: u64,
    /// 单次等待零速状态的超时（毫秒），超时后重试
    pub stop_poll_timeout_ms: u64,
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            laps: 3,
            debounce_ms: 500,
            settle_ms: 1000,
            final_wait_ms: 10_000,
            stop_poll_timeout_ms: 1000,
        }
    }
}

/// 线性距离模型参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceSection {
    pub slope: f64,
    pub intercept: f64,
}

impl Default for DistanceSection {
    fn default() -> Self {
        Self {
            slope: LinearDistanceEstimator::DEFAULT_SLOPE,
            intercept: LinearDistanceEstimator::DEFAULT_INTERCEPT,
        }
    }
}

/// 蜂鸣器
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundSection {
    pub pitch: u32,
    pub pitch_duration_ms: u64,
    pub interval_ms: u64,
    /// 结束提示音
    pub final_cue_hz: u32,
    pub final_cue_ms: u64,
}

impl Default for SoundSection {
    fn default() -> Self {
        Self {
            pitch: 1000,
            pitch_duration_ms: 200,
            interval_ms: 300,
            final_cue_hz: 3000,
            final_cue_ms: 1000,
        }
    }
}

fn check_percent(field: &'static str, value: i32) -> Result<(), ConfigError> {
    if !(0..=100).contains(&value) {
        return Err(ConfigError::invalid(field, format!("{} is outside 0..=100", value)));
    }
    Ok(())
}

fn check_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

impl HnsConfig {
    /// 读取、解析并校验配置文件
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// 解析并校验 TOML 文本
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: HnsConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.link.port.is_empty() {
            return Err(ConfigError::invalid("link.port", "must not be empty"));
        }
        if self.link.baud_rate == 0 {
            return Err(ConfigError::invalid("link.baud_rate", "must be greater than zero"));
        }
        check_positive("link.timeout_ms", self.link.timeout_ms)?;

        check_percent("drive.full_speed", self.drive.full_speed)?;
        check_percent("drive.stop_speed", self.drive.stop_speed)?;
        if self.drive.stop_speed > self.drive.full_speed {
            return Err(ConfigError::invalid(
                "drive.stop_speed",
                "must not exceed drive.full_speed",
            ));
        }

        check_positive("capture.latest_timeout_ms", self.capture.latest_timeout_ms)?;

        if self.voting.workers == 0 {
            return Err(ConfigError::invalid("voting.workers", "at least one worker is required"));
        }
        check_positive("voting.poll_timeout_ms", self.voting.poll_timeout_ms)?;

        if self.sequencer.laps == 0 {
            return Err(ConfigError::invalid("sequencer.laps", "at least one lap is required"));
        }
        check_positive("sequencer.debounce_ms", self.sequencer.debounce_ms)?;
        check_positive("sequencer.stop_poll_timeout_ms", self.sequencer.stop_poll_timeout_ms)?;

        if !self.distance.slope.is_finite() || !self.distance.intercept.is_finite() {
            return Err(ConfigError::invalid("distance", "slope and intercept must be finite"));
        }
        Ok(())
    }

    pub fn link_config(&self) -> LinkConfig {
        LinkConfig {
            port: self.link.port.clone(),
            baud_rate: self.link.baud_rate,
            timeout: Duration::from_millis(self.link.timeout_ms),
        }
    }

    pub fn voting_config(&self) -> VotingConfig {
        VotingConfig {
            workers: self.voting.workers,
            poll_timeout: Duration::from_millis(self.voting.poll_timeout_ms),
            signal_kind: SignalKind::Info,
        }
    }

    pub fn sequencer_settings(&self) -> SequencerSettings {
        SequencerSettings {
            full_speed: self.drive.full_speed,
            stop_speed: self.drive.stop_speed,
            laps: self.sequencer.laps,
            debounce: Duration::from_millis(self.sequencer.debounce_ms),
            latest_timeout: Duration::from_millis(self.capture.latest_timeout_ms),
            settle: Duration::from_millis(self.sequencer.settle_ms),
            final_wait: Duration::from_millis(self.sequencer.final_wait_ms),
            stop_poll_timeout: Duration::from_millis(self.sequencer.stop_poll_timeout_ms),
            final_cue_hz: self.sound.final_cue_hz,
            final_cue: Duration::from_millis(self.sound.final_cue_ms),
        }
    }

    pub fn distance_estimator(&self) -> LinearDistanceEstimator {
        LinearDistanceEstimator::new(self.distance.slope, self.distance.intercept)
    }

    pub fn beep_pattern(&self) -> BeepPattern {
        BeepPattern {
            pitch_hz: self.sound.pitch,
            beep: Duration::from_millis(self.sound.pitch_duration_ms),
            interval: Duration::from_millis(self.sound.interval_ms),
            ..BeepPattern::default()
        }
    }
}

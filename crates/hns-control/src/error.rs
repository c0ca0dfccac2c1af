//! 控制层错误类型定义

use hns_driver::DriverError;
use hns_vision::{CaptureError, ClassificationError, VotingError};
use std::path::PathBuf;
use thiserror::Error;

/// 比赛流程错误
#[derive(Error, Debug)]
pub enum SequencerError {
    /// 通信运行时错误（启动时串口不可用等）
    #[error("Communication error: {0}")]
    Driver(#[from] DriverError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Voting error: {0}")]
    Voting(#[from] VotingError),

    /// 无法创建分类器
    #[error("Perception error: {0}")]
    Perception(#[from] ClassificationError),

    /// 计圈结束时投票池没有任何有效票
    #[error("No info signal digit was voted")]
    NoVote,

    /// `run()` 只能调用一次
    #[error("Sequencer already ran (phase {0})")]
    AlreadyRan(crate::Phase),

    /// 被外部中止
    #[error("Run aborted")]
    Aborted,
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

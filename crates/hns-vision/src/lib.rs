//! # HNS Vision
//!
//! 摄像头帧的并发分发与多线程投票：
//!
//! - [`CaptureMailbox`]: 采集线程 + 单槽最新帧邮箱 + 无界工作队列
//! - [`VotingPool`]: N 个工作线程识别信息信号数字，多数投票
//! - [`perception`]: 信号分类、数字识别、帧源、距离估计等协作者接口
//! - `mock`: 脚本化帧源和分类器（`mock` feature）
//!
//! # 数据流
//!
//! ```text
//! FrameSource ──> capture thread ──crop──┬──> latest slot ──> 控制线程
//!                                        └──> work queue  ──> hns-vote-0..N
//! ```

mod error;
mod image;
pub mod mailbox;
pub mod perception;
pub mod tally;
pub mod voting;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use error::{CaptureError, ClassificationError, VotingError};
pub use image::Image;
pub use mailbox::{CaptureMailbox, CropFn};
pub use perception::{
    DetectedSignal, DigitClassifier, DistanceEstimator, FrameSource, LinearDistanceEstimator,
    PerceptionFactory, SignalClassifier, SignalKind, detect_digit, half_frame_crop,
};
pub use tally::VoteTally;
pub use voting::{VotingConfig, VotingPool};

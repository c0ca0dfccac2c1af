//! # HNS Control
//!
//! 比赛流程控制：装货等待、起点信号去抖计圈、信息信号投票、
//! 停车信号接近与距离归位，以及配置加载和声音播报。
//!
//! # 使用示例
//!
//! ```no_run
//! use hns_control::{ControlSequencer, HnsConfig};
//! use hns_driver::RuntimeBuilder;
//! # use hns_vision::{FrameSource, PerceptionFactory};
//! # use std::sync::Arc;
//! # fn camera() -> Box<dyn FrameSource> { unimplemented!() }
//! # fn perception() -> Arc<dyn PerceptionFactory> { unimplemented!() }
//!
//! let config = HnsConfig::load("configs/hns.toml")?;
//! let runtime = RuntimeBuilder::new().link_config(config.link_config()).build();
//!
//! let mut sequencer = ControlSequencer::new(
//!     runtime,
//!     camera(),
//!     perception(),
//!     config.voting_config(),
//!     config.sequencer_settings(),
//! )?;
//! let report = sequencer.run()?;
//! println!("stopped at digit {}", report.voted_digit);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod audio;
pub mod cargo;
pub mod config;
mod error;
pub mod laps;
mod phase;
pub mod sequencer;

pub use audio::{AudioAnnouncer, BeepAnnouncer, BeepPattern, LogTone, ToneOutput};
pub use cargo::{CargoLatch, CargoWait};
pub use config::HnsConfig;
pub use error::{ConfigError, SequencerError};
pub use laps::LapCounter;
pub use phase::{AtomicPhase, Phase};
pub use sequencer::{ControlSequencer, RunReport, SequencerHandle, SequencerSettings};

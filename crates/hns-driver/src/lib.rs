//! # HNS Driver
//!
//! 串口通信运行时，包括：
//! - IO 线程管理（TX / RX 双线程，互不阻塞）
//! - 状态同步（ArcSwap 无锁读取）
//! - 状态监听器（同步回调 / 有界通道订阅）
//! - 链路指标（原子计数器）
//!
//! # 使用示例
//!
//! ```no_run
//! use hns_driver::RuntimeBuilder;
//! use std::time::Duration;
//!
//! let mut runtime = RuntimeBuilder::new().build();
//! runtime.start()?;
//! runtime.set_target_speed(100);
//!
//! // 等待控制器确认停车
//! runtime.set_target_speed(0);
//! runtime.wait_for_status(|s| s.is_stopped(), Duration::from_secs(5))?;
//! runtime.stop()?;
//! # Ok::<(), hns_driver::DriverError>(())
//! ```

mod builder;
mod error;
pub mod hooks;
pub mod metrics;
pub mod pipeline;
mod runtime;
pub mod state;

pub use builder::RuntimeBuilder;
pub use error::DriverError;
pub use hooks::{ChannelListener, ListenerRegistry, StatusListener};
pub use metrics::{LinkMetrics, MetricsSnapshot};
pub use pipeline::{PipelineConfig, rx_loop, tx_loop};
pub use runtime::CommunicationRuntime;
pub use state::LinkState;

// 常用类型直接从本 crate 导出
pub use hns_protocol::{MovementCommand, StatusSnapshot};
pub use hns_serial::{LinkConfig, LinkConnector, LinkError};

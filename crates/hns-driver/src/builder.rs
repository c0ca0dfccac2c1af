//! Builder 模式实现
//!
//! 提供链式构造 [`CommunicationRuntime`] 的便捷方式。

use crate::pipeline::PipelineConfig;
use crate::runtime::CommunicationRuntime;
use hns_serial::{LinkConfig, LinkConnector, SerialPortConnector};
use std::time::Duration;

/// Runtime Builder（链式构造）
///
/// 默认使用 `serialport` 打开 `/dev/serial0`，115200 baud，3 秒超时。
/// 通过 [`connector`](Self::connector) 可以替换为任意链路（例如模拟控制器）。
///
/// # Example
///
/// ```no_run
/// use hns_driver::RuntimeBuilder;
/// use std::time::Duration;
///
/// let runtime = RuntimeBuilder::new()
///     .port("/dev/ttyUSB0")
///     .timeout(Duration::from_secs(1))
///     .build();
/// ```
#[derive(Default)]
pub struct RuntimeBuilder {
    link: LinkConfig,
    pipeline_config: Option<PipelineConfig>,
    connector: Option<Box<dyn LinkConnector>>,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 串口设备路径
    pub fn port(mut self, port: impl Into<String>) -> Self {
        self.link.port = port.into();
        self
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.link.baud_rate = baud_rate;
        self
    }

    /// 读写超时
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.link.timeout = timeout;
        self
    }

    /// 一次性设置全部链路参数
    pub fn link_config(mut self, link: LinkConfig) -> Self {
        self.link = link;
        self
    }

    pub fn pipeline_config(mut self, config: PipelineConfig) -> Self {
        self.pipeline_config = Some(config);
        self
    }

    /// 使用自定义链路（设置后忽略 port / baud / timeout）
    pub fn connector(mut self, connector: Box<dyn LinkConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> CommunicationRuntime {
        let connector = self
            .connector
            .unwrap_or_else(|| Box::new(SerialPortConnector::new(self.link)));
        CommunicationRuntime::new(connector, self.pipeline_config.unwrap_or_default())
    }
}

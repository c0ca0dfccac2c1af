//! 实车运行命令
//!
//! 通过串口驱动真实的电机控制器；赛道画面来自脚本化帧源，
//! 用于在台架上验证控制器、装货信号和停车流程。

use super::run_sequencer;
use crate::scenario::TrackScript;
use anyhow::{Context, Result, ensure};
use clap::Args;
use hns_control::{BeepAnnouncer, ControlSequencer, HnsConfig, LogTone};
use hns_driver::RuntimeBuilder;
use hns_vision::mock::ScriptedPerception;
use std::sync::Arc;
use std::time::Duration;

/// 实车运行参数
#[derive(Args, Debug)]
pub struct RunCommand {
    /// 串口设备（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 脚本化信息信号上的数字（0-9）
    #[arg(short, long, default_value_t = 3)]
    pub digit: u8,

    /// 帧间隔（毫秒）
    #[arg(long, default_value_t = 100)]
    pub frame_interval: u64,
}

impl RunCommand {
    pub fn execute(&self, config: &HnsConfig) -> Result<()> {
        ensure!(self.digit <= 9, "digit must be between 0 and 9");

        let mut link = config.link_config();
        if let Some(port) = &self.port {
            link.port = port.clone();
        }
        println!("🔌 串口: {} @ {} baud", link.port, link.baud_rate);

        let settings = config.sequencer_settings();
        let script = TrackScript {
            digit: self.digit,
            laps: settings.laps,
            frame_interval: Duration::from_millis(self.frame_interval),
            debounce: settings.debounce,
        };

        let runtime = RuntimeBuilder::new().link_config(link).build();
        let sequencer = ControlSequencer::new(
            runtime,
            Box::new(script.into_source()),
            Arc::new(ScriptedPerception),
            config.voting_config(),
            settings,
        )
        .context("Failed to assemble sequencer")?
        .with_distance_estimator(Box::new(config.distance_estimator()))
        .with_announcer(Arc::new(BeepAnnouncer::new(LogTone, config.beep_pattern())));

        run_sequencer(sequencer)?;
        Ok(())
    }
}

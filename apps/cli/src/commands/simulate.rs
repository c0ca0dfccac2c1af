//! 模拟运行命令
//!
//! 模拟电机控制器 + 脚本化赛道，不需要任何硬件。

use super::run_sequencer;
use crate::scenario::TrackScript;
use anyhow::{Context, Result, ensure};
use clap::Args;
use hns_control::{BeepAnnouncer, ControlSequencer, HnsConfig, LogTone};
use hns_driver::RuntimeBuilder;
use hns_serial::mock::{SimulatedController, SimulatorConfig};
use hns_vision::mock::ScriptedPerception;
use std::sync::Arc;
use std::time::Duration;

/// 模拟运行参数
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// 信息信号上的数字（0-9）
    #[arg(short, long, default_value_t = 3)]
    pub digit: u8,

    /// 帧间隔（毫秒）
    #[arg(long, default_value_t = 100)]
    pub frame_interval: u64,

    /// 模拟控制器多久后报告装货（毫秒）
    #[arg(long, default_value_t = 500)]
    pub cargo_after: u64,

    /// 使用配置中的等待时间（默认压缩为 100 ms 以便快速完成）
    #[arg(long)]
    pub real_time: bool,
}

impl SimulateCommand {
    pub fn execute(&self, config: &HnsConfig) -> Result<()> {
        ensure!(self.digit <= 9, "digit must be between 0 and 9");

        let mut settings = config.sequencer_settings();
        if !self.real_time {
            let short = Duration::from_millis(100);
            settings.settle = settings.settle.min(short);
            settings.final_wait = settings.final_wait.min(short);
        }

        let script = TrackScript {
            digit: self.digit,
            laps: settings.laps,
            frame_interval: Duration::from_millis(self.frame_interval),
            debounce: settings.debounce,
        };

        let controller = SimulatedController::with_config(SimulatorConfig::default());
        let runtime = RuntimeBuilder::new().connector(Box::new(controller.clone())).build();

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

        let cargo_after = Duration::from_millis(self.cargo_after);
        let loader = controller.clone();
        std::thread::Builder::new()
            .name("hns-sim-cargo".into())
            .spawn(move || {
                std::thread::sleep(cargo_after);
                loader.load_cargo();
            })
            .context("Failed to spawn cargo loader")?;

        println!("🚗 模拟运行（目标数字 {}）", self.digit);
        let report = run_sequencer(sequencer)?;

        println!("  下发指令:");
        for command in controller.commands() {
            println!("    speed={:3} distance_ticks={}", command.speed, command.distance_ticks);
        }
        ensure!(
            report.voted_digit == self.digit,
            "voted digit {} does not match scripted digit {}",
            report.voted_digit,
            self.digit
        );
        Ok(())
    }
}

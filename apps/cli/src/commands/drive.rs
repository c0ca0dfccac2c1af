//! 手动驾驶命令
//!
//! 下发一次速度和 / 或剩余距离，保持一段时间后停车。

use anyhow::{Context, Result, ensure};
use clap::Args;
use hns_control::HnsConfig;
use hns_driver::RuntimeBuilder;
use std::time::Duration;

/// 手动驾驶参数
#[derive(Args, Debug)]
pub struct DriveCommand {
    /// 串口设备（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 目标速度（满量程百分比，0-100）
    #[arg(short, long)]
    pub speed: Option<i32>,

    /// 剩余行驶距离（毫米）
    #[arg(short, long)]
    pub distance: Option<f64>,

    /// 保持时间（秒），之后下发零速
    #[arg(long, default_value_t = 2.0)]
    pub hold: f64,
}

impl DriveCommand {
    pub fn execute(&self, config: &HnsConfig) -> Result<()> {
        ensure!(
            self.speed.is_some() || self.distance.is_some(),
            "at least one of --speed or --distance is required"
        );
        if let Some(speed) = self.speed {
            ensure!((0..=100).contains(&speed), "speed must be between 0 and 100");
        }
        ensure!(self.hold.is_finite() && self.hold >= 0.0, "hold must be a non-negative number");

        let mut link = config.link_config();
        if let Some(port) = &self.port {
            link.port = port.clone();
        }
        let poll = link.timeout;

        let mut runtime = RuntimeBuilder::new().link_config(link).build();
        runtime.start().context("Failed to open serial link")?;

        if let Some(speed) = self.speed {
            runtime.set_target_speed(speed);
        }
        if let Some(distance) = self.distance {
            runtime.set_distance_to_go(distance);
        }
        println!("🚗 指令: {:?}", runtime.command());

        std::thread::sleep(Duration::from_secs_f64(self.hold));

        println!("🛑 停车...");
        runtime.set_target_speed(0);
        match runtime.wait_for_status(|s| s.is_stopped(), poll) {
            Ok(status) => println!("✅ 已停车 (wheel={:.1})", status.wheel_cycles),
            Err(e) => println!("⚠ 未确认停车: {}", e),
        }

        runtime.stop()?;
        Ok(())
    }
}

//! 状态监控命令
//!
//! 连接电机控制器，打印收到的状态和链路统计。

use super::install_stop_flag;
use anyhow::{Context, Result};
use clap::Args;
use crossbeam_channel::RecvTimeoutError;
use hns_control::HnsConfig;
use hns_driver::RuntimeBuilder;
use std::sync::atomic::Ordering;
use std::time::Duration;

/// 监控参数
#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 串口设备（覆盖配置）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 打印多少条状态后退出，0 表示直到 Ctrl+C
    #[arg(short = 'n', long, default_value_t = 0)]
    pub count: u64,
}

impl MonitorCommand {
    pub fn execute(&self, config: &HnsConfig) -> Result<()> {
        let mut link = config.link_config();
        if let Some(port) = &self.port {
            link.port = port.clone();
        }
        let timeout = link.timeout;

        let mut runtime = RuntimeBuilder::new().link_config(link).build();
        let statuses = runtime.subscribe_status(64);
        let running = install_stop_flag()?;

        runtime.start().context("Failed to open serial link")?;
        println!("✓ 已连接 {}，按 Ctrl+C 退出", runtime.describe());

        let mut printed = 0u64;
        while running.load(Ordering::SeqCst) && (self.count == 0 || printed < self.count) {
            match statuses.recv_timeout(timeout) {
                Ok(status) => {
                    printed += 1;
                    println!(
                        "[{:>5}] speed={:6.2} accel=({:6.2}, {:6.2}) wheel={:8.1} cargo={}",
                        printed,
                        status.current_speed,
                        status.accel_x,
                        status.accel_y,
                        status.wheel_cycles,
                        if status.cargo_picked() { "yes" } else { "no" },
                    );
                },
                Err(RecvTimeoutError::Timeout) => {
                    if !runtime.is_running() {
                        anyhow::bail!("Serial link closed");
                    }
                    println!("⚠ {:?} 内没有收到状态", timeout);
                },
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        runtime.stop()?;
        let metrics = runtime.metrics();
        println!(
            "📊 frames: {} valid / {} total, errors: {}, rx error rate: {:.1}%",
            metrics.rx_frames_valid,
            metrics.rx_frames_total,
            metrics.rx_frame_errors,
            metrics.rx_error_rate() * 100.0,
        );
        Ok(())
    }
}

//! 命令定义和实现

pub mod config;
pub mod drive;
pub mod monitor;
pub mod run;
pub mod simulate;

pub use config::ConfigCommand;
pub use drive::DriveCommand;
pub use monitor::MonitorCommand;
pub use run::RunCommand;
pub use simulate::SimulateCommand;

use anyhow::{Context, Result};
use hns_control::{ControlSequencer, HnsConfig, RunReport, SequencerHandle};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

/// 加载配置；未指定路径时使用默认值
pub fn load_config(path: Option<&Path>) -> Result<HnsConfig> {
    match path {
        Some(path) => HnsConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(HnsConfig::default()),
    }
}

/// Ctrl+C 时中止流程
fn install_abort_handler(handle: SequencerHandle) -> Result<()> {
    ctrlc::set_handler(move || {
        println!("\n收到退出信号，正在停车...");
        handle.abort();
    })
    .context("Failed to install Ctrl+C handler")
}

/// Ctrl+C 时清除运行标志
fn install_stop_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .context("Failed to install Ctrl+C handler")?;
    Ok(running)
}

/// 执行完整流程并打印结果
fn run_sequencer(mut sequencer: ControlSequencer) -> Result<RunReport> {
    install_abort_handler(sequencer.handle())?;

    println!("⏳ 等待吊臂装货...");
    let report = sequencer.run().context("Run failed")?;
    info!("Run finished: {:?}", report);
    print_report(&report);
    Ok(report)
}

fn print_report(report: &RunReport) {
    println!("✅ 完成");
    println!("  圈数: {}", report.laps);
    println!("  停车数字: {}", report.voted_digit);
    println!("  检查帧数: {}", report.stop_frames_inspected);
    match report.remaining_distance_mm {
        Some(distance) => println!("  剩余距离: {:.1} mm", distance),
        None => println!("  剩余距离: 未检测到停车信号"),
    }
}

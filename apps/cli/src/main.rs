//! # HNS CLI
//!
//! HNS 自动驾驶小车命令行工具。
//!
//! ```bash
//! # 检查配置文件
//! hns-cli --config configs/hns.toml config check
//!
//! # 在模拟控制器上完整跑一遍流程
//! hns-cli simulate --digit 3
//!
//! # 实车：打印状态遥测 / 手动下发速度
//! hns-cli monitor --count 20
//! hns-cli drive --speed 30 --hold 2
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod scenario;

use commands::{ConfigCommand, DriveCommand, MonitorCommand, RunCommand, SimulateCommand};

/// HNS CLI - 自动驾驶小车命令行工具
#[derive(Parser, Debug)]
#[command(name = "hns-cli")]
#[command(about = "Command-line interface for the HNS autonomous vehicle", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件（TOML），缺省时使用内置默认值
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 日志详细程度（-v: debug, -vv: trace）
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),

    /// 在实车串口上执行完整流程（脚本化赛道画面）
    Run {
        #[command(flatten)]
        args: RunCommand,
    },

    /// 在模拟控制器上执行完整流程
    Simulate {
        #[command(flatten)]
        args: SimulateCommand,
    },

    /// 打印状态遥测
    Monitor {
        #[command(flatten)]
        args: MonitorCommand,
    },

    /// 手动下发速度 / 距离
    Drive {
        #[command(flatten)]
        args: DriveCommand,
    },
}

fn init_tracing(verbose: u8) -> Result<()> {
    let level = match verbose {
        0 => "hns=info",
        1 => "hns=debug,telemetry=debug",
        _ => "hns=trace,telemetry=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.parse()?))
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let path = cli.config.as_deref();

    match cli.command {
        Commands::Config(cmd) => cmd.execute(path),
        Commands::Run { args } => args.execute(&commands::load_config(path)?),
        Commands::Simulate { args } => args.execute(&commands::load_config(path)?),
        Commands::Monitor { args } => args.execute(&commands::load_config(path)?),
        Commands::Drive { args } => args.execute(&commands::load_config(path)?),
    }
}

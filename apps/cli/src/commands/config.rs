//! 配置管理命令

use anyhow::{Context, Result};
use clap::Subcommand;
use hns_control::HnsConfig;
use std::path::Path;

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 校验配置文件
    Check,

    /// 打印生效的配置（TOML）
    Show,
}

impl ConfigCommand {
    pub fn execute(&self, path: Option<&Path>) -> Result<()> {
        let config = super::load_config(path)?;
        match self {
            ConfigCommand::Check => {
                match path {
                    Some(path) => println!("✅ {} is valid", path.display()),
                    None => println!("✅ built-in defaults are valid"),
                }
                Ok(())
            },
            ConfigCommand::Show => {
                let text = config.to_toml_string().context("Failed to serialize config")?;
                print!("{}", text);
                Ok(())
            },
        }
    }
}

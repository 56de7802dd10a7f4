//! 重启路由器与应用节点更新的可替换动作

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::api::RouterApi;
use crate::common::error::{Error, Result};
use crate::config::registry::preview;

/// 配置写入成功后重启路由器
#[async_trait]
pub trait RestartAction: Send + Sync {
    async fn restart(&self) -> Result<()>;
}

/// 节点文件变化后执行的更新动作，返回一行摘要
#[async_trait]
pub trait UpdateAction: Send + Sync {
    async fn apply(&self, path: &Path) -> Result<String>;
}

/// 执行外部重启命令，退出码 0 视为成功
pub struct CommandRestart {
    argv: Vec<String>,
}

impl CommandRestart {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl RestartAction for CommandRestart {
    async fn restart(&self) -> Result<()> {
        run_command(&self.argv).await?;
        info!(command = %self.argv.join(" "), "router restarted");
        Ok(())
    }
}

/// 通过控制 API 重启
pub struct ApiRestart {
    api: Arc<dyn RouterApi>,
}

impl ApiRestart {
    pub fn new(api: Arc<dyn RouterApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl RestartAction for ApiRestart {
    async fn restart(&self) -> Result<()> {
        self.api.restart().await?;
        info!("router restart requested via api");
        Ok(())
    }
}

pub struct NoRestart;

#[async_trait]
impl RestartAction for NoRestart {
    async fn restart(&self) -> Result<()> {
        debug!("restart disabled, skipping");
        Ok(())
    }
}

/// 调用外部程序处理节点文件
pub struct ScriptUpdate {
    argv: Vec<String>,
}

impl ScriptUpdate {
    pub fn new(argv: Vec<String>) -> Self {
        Self { argv }
    }
}

#[async_trait]
impl UpdateAction for ScriptUpdate {
    async fn apply(&self, path: &Path) -> Result<String> {
        debug!(path = %path.display(), command = %self.argv.join(" "), "running update script");
        let stdout = run_command(&self.argv).await?;
        Ok(stdout
            .lines()
            .last()
            .map(str::trim)
            .unwrap_or_default()
            .to_string())
    }
}

/// 运行命令并返回标准输出；非零退出码转换为 `UpdateFailed`
pub async fn run_command(argv: &[String]) -> Result<String> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| Error::Config("empty command".to_string()))?;

    let output = Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::UpdateFailed(format!(
            "{} exited with {}: {}",
            program,
            output.status,
            preview(stderr.trim(), 200)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

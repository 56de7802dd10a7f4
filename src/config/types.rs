use anyhow::Result;
use serde::Deserialize;

/// 应用设置文件
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    #[serde(default)]
    pub nodes: NodesConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub restart: RestartConfig,
    #[serde(default)]
    pub backup: Option<BackupConfig>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if let Some(api) = &self.api {
            if api.url.trim().is_empty() {
                anyhow::bail!("api.url must not be empty");
            }
            url::Url::parse(&api.url)
                .map_err(|e| anyhow::anyhow!("api.url '{}' is invalid: {}", api.url, e))?;
        }
        if self.nodes.path.trim().is_empty() {
            anyhow::bail!("nodes.path must not be empty");
        }
        if self.watch.interval_secs == 0 {
            anyhow::bail!("watch.interval_secs must be greater than 0");
        }
        if self.update.mode == UpdateMode::Script && self.update.command.is_empty() {
            anyhow::bail!("update.command is required when update.mode is script");
        }
        if self.restart.mode == RestartMode::Command && self.restart.command.is_empty() {
            anyhow::bail!("restart.command is required when restart.mode is command");
        }
        if let Some(backup) = &self.backup {
            if backup.path.trim().is_empty() {
                anyhow::bail!("backup.path must not be empty");
            }
        }
        Ok(())
    }

    /// 需要访问路由器 API 的命令调用
    pub fn require_api(&self) -> Result<&ApiConfig> {
        self.api
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("api.url is required for this command"))
    }
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// 路由器控制 API
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub url: String,
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NodesConfig {
    #[serde(default = "default_nodes_path")]
    pub path: String,
}

impl Default for NodesConfig {
    fn default() -> Self {
        Self {
            path: default_nodes_path(),
        }
    }
}

fn default_nodes_path() -> String {
    "/root/OpenClashManage/wangluo/nodes.txt".to_string()
}

#[derive(Debug, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMode {
    /// 进程内解析节点文件并同步
    #[default]
    Sync,
    /// 调用外部程序
    Script,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateConfig {
    #[serde(default)]
    pub mode: UpdateMode,
    #[serde(default)]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RestartMode {
    #[default]
    Command,
    Api,
    None,
}

#[derive(Debug, Deserialize)]
pub struct RestartConfig {
    #[serde(default)]
    pub mode: RestartMode,
    #[serde(default = "default_restart_command")]
    pub command: Vec<String>,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            mode: RestartMode::default(),
            command: default_restart_command(),
        }
    }
}

fn default_restart_command() -> Vec<String> {
    vec!["/etc/init.d/openclash".to_string(), "restart".to_string()]
}

#[derive(Debug, Deserialize)]
pub struct BackupConfig {
    pub path: String,
}

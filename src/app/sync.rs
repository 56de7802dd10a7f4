//! 拉取配置 → 合并节点 → 校验 → 写回 → 重启

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::api::RouterApi;
use crate::common::error::{Error, Result};
use crate::config::merge;
use crate::config::node::Node;
use crate::config::registry::NodeFile;

use super::restart::{RestartAction, UpdateAction};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub added_nodes: Vec<String>,
    pub updated_groups: Vec<String>,
}

impl SyncReport {
    pub fn summary(&self) -> String {
        format!(
            "added {} nodes, updated {} groups",
            self.added_nodes.len(),
            self.updated_groups.len()
        )
    }
}

/// 同一个路由器上的同步操作串行执行
pub struct Synchronizer {
    api: Arc<dyn RouterApi>,
    restart: Arc<dyn RestartAction>,
    backup_path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl Synchronizer {
    pub fn new(api: Arc<dyn RouterApi>, restart: Arc<dyn RestartAction>) -> Self {
        Self {
            api,
            restart,
            backup_path: None,
            lock: Mutex::new(()),
        }
    }

    /// 写入前把拉到的原始配置保存到该路径
    pub fn with_backup(mut self, path: impl Into<PathBuf>) -> Self {
        self.backup_path = Some(path.into());
        self
    }

    /// Merge `nodes` into the router's live configuration and apply it.
    ///
    /// Any failing step aborts the rest. When the router rejects the merged
    /// document nothing is written.
    pub async fn auto_sync(&self, nodes: &[Node]) -> Result<SyncReport> {
        let _guard = self.lock.lock().await;

        let mut doc = self.api.fetch_config().await?;
        self.backup(&doc).await?;

        let added_nodes = merge::merge_proxies(&mut doc, nodes)?;
        let updated_groups = merge::merge_groups(&mut doc, &added_nodes)?;
        debug!(
            added = added_nodes.len(),
            groups = updated_groups.len(),
            "configuration merged"
        );

        self.commit(&doc).await?;

        let report = SyncReport {
            added_nodes,
            updated_groups,
        };
        info!(
            added = report.added_nodes.len(),
            groups = report.updated_groups.len(),
            "sync completed"
        );
        Ok(report)
    }

    /// 向单个组追加代理；组不存在时返回 `GroupNotFound`
    pub async fn add_to_group(&self, group: &str, proxy: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;

        let mut doc = self.api.fetch_config().await?;
        let original = doc.clone();
        if !merge::add_proxy_to_group(&mut doc, group, proxy)? {
            debug!(group = group, proxy = proxy, "proxy already in group");
            return Ok(false);
        }
        self.backup(&original).await?;
        self.commit(&doc).await?;
        info!(group = group, proxy = proxy, "proxy added to group");
        Ok(true)
    }

    /// 新增或替换同名代理
    pub async fn upsert_node(&self, node: &Node) -> Result<()> {
        let _guard = self.lock.lock().await;

        let mut doc = self.api.fetch_config().await?;
        self.backup(&doc).await?;
        let replaced = merge::upsert_proxy(&mut doc, node)?;
        self.commit(&doc).await?;
        info!(name = %node.name, replaced = replaced, "proxy saved");
        Ok(())
    }

    /// 读取节点文件并同步
    pub async fn sync_file(&self, path: &Path) -> Result<SyncReport> {
        let nodes = NodeFile::new(path).load_nodes().await?;
        if nodes.is_empty() {
            warn!(path = %path.display(), "node file has no parseable links");
        }
        self.auto_sync(&nodes).await
    }

    async fn backup(&self, doc: &Value) -> Result<()> {
        let Some(path) = &self.backup_path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path, serde_json::to_vec_pretty(doc)?).await?;
        debug!(path = %path.display(), "configuration backed up");
        Ok(())
    }

    async fn commit(&self, doc: &Value) -> Result<()> {
        match self.api.verify_config(doc).await {
            Ok(()) => {}
            Err(e @ Error::RouterStatus { .. }) => {
                return Err(Error::VerificationFailed(e.to_string()));
            }
            Err(e) => return Err(e),
        }
        self.api.write_config(doc).await?;
        self.restart.restart().await
    }
}

/// 在进程内解析节点文件并同步
pub struct SyncUpdate {
    sync: Arc<Synchronizer>,
}

impl SyncUpdate {
    pub fn new(sync: Arc<Synchronizer>) -> Self {
        Self { sync }
    }
}

#[async_trait]
impl UpdateAction for SyncUpdate {
    async fn apply(&self, path: &Path) -> Result<String> {
        Ok(self.sync.sync_file(path).await?.summary())
    }
}

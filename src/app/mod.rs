pub mod events;
pub mod restart;
pub mod sync;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::api::{HttpRouterClient, RouterApi};
use crate::config::types::{RestartMode, UpdateMode};
use crate::config::Settings;

use restart::{ApiRestart, CommandRestart, NoRestart, RestartAction, ScriptUpdate, UpdateAction};
use sync::{SyncUpdate, Synchronizer};
use watcher::NodeWatcher;

pub fn build_router_client(settings: &Settings) -> Result<Arc<dyn RouterApi>> {
    let api = settings.require_api()?;
    let client = HttpRouterClient::new(&api.url, api.secret.clone())?;
    Ok(Arc::new(client))
}

/// 按设置组装同步器（API 客户端、重启方式、备份路径）
pub fn build_synchronizer(settings: &Settings) -> Result<Arc<Synchronizer>> {
    let api = build_router_client(settings)?;
    let restart: Arc<dyn RestartAction> = match settings.restart.mode {
        RestartMode::Command => Arc::new(CommandRestart::new(settings.restart.command.clone())),
        RestartMode::Api => Arc::new(ApiRestart::new(api.clone())),
        RestartMode::None => Arc::new(NoRestart),
    };

    let mut sync = Synchronizer::new(api, restart);
    if let Some(backup) = &settings.backup {
        sync = sync.with_backup(&backup.path);
    }
    Ok(Arc::new(sync))
}

pub fn build_watcher(settings: &Settings) -> Result<NodeWatcher> {
    let updater: Arc<dyn UpdateAction> = match settings.update.mode {
        UpdateMode::Sync => Arc::new(SyncUpdate::new(build_synchronizer(settings)?)),
        UpdateMode::Script => Arc::new(ScriptUpdate::new(settings.update.command.clone())),
    };
    info!(
        path = %settings.nodes.path,
        mode = ?settings.update.mode,
        "watcher configured"
    );
    Ok(NodeWatcher::new(
        &settings.nodes.path,
        Duration::from_secs(settings.watch.interval_secs),
        updater,
    ))
}

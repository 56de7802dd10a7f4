//! 节点文件轮询监视器
//!
//! 按固定间隔读取文件并计算 MD5，内容变化时发出 `NodesChanged` 并执行更新动作。
//! 下一次检查在上一次检查（包括更新动作）完成后 `interval` 才开始。

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use md5::{Digest, Md5};
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::common::error::Result;

use super::events::{EventBus, WatchEvent};
use super::restart::UpdateAction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatcherStatus {
    pub watching: bool,
    pub path: PathBuf,
    pub last_hash: String,
}

struct Inner {
    path: PathBuf,
    interval: Duration,
    updater: Arc<dyn UpdateAction>,
    bus: EventBus,
    /// 持有期间即为一次检查，保证检查不重叠
    check_lock: Mutex<()>,
    last_hash: StdMutex<String>,
    running: AtomicBool,
    /// 每次 start/stop 递增，轮询任务看到变化即退出
    epoch: watch::Sender<u64>,
    /// start/stop 整体互斥：状态切换、epoch 递增和事件发出不交错
    lifecycle: StdMutex<()>,
}

/// 可 clone 的监视器句柄
#[derive(Clone)]
pub struct NodeWatcher {
    inner: Arc<Inner>,
}

impl NodeWatcher {
    pub fn new(
        path: impl Into<PathBuf>,
        interval: Duration,
        updater: Arc<dyn UpdateAction>,
    ) -> Self {
        let (epoch, _) = watch::channel(0u64);
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                interval,
                updater,
                bus: EventBus::new(),
                check_lock: Mutex::new(()),
                last_hash: StdMutex::new(String::new()),
                running: AtomicBool::new(false),
                epoch,
                lifecycle: StdMutex::new(()),
            }),
        }
    }

    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(listener);
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn is_watching(&self) -> bool {
        self.inner.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            watching: self.is_watching(),
            path: self.inner.path.clone(),
            last_hash: self.inner.current_hash(),
        }
    }

    /// 启动轮询；已在运行时返回 None。
    ///
    /// 事件监听者内不能调用 `start`/`stop`。
    pub fn start(&self) -> Option<JoinHandle<()>> {
        let _lifecycle = self.inner.lock_lifecycle();
        if self.inner.running.load(Ordering::SeqCst) {
            debug!(path = %self.inner.path.display(), "watcher already running");
            return None;
        }
        self.inner.epoch.send_modify(|e| *e += 1);
        let mut epoch_rx = self.inner.epoch.subscribe();
        self.inner.running.store(true, Ordering::SeqCst);

        info!(
            path = %self.inner.path.display(),
            interval = ?self.inner.interval,
            "node watcher started"
        );
        self.inner.bus.emit(&WatchEvent::Started {
            path: self.inner.path.clone(),
        });

        let inner = self.inner.clone();
        Some(tokio::spawn(async move {
            loop {
                let _ = inner.check_once().await;
                tokio::select! {
                    _ = tokio::time::sleep(inner.interval) => {}
                    _ = epoch_rx.changed() => break,
                }
            }
            debug!(path = %inner.path.display(), "poll loop exited");
        }))
    }

    /// 停止后续检查；正在进行的检查不会被打断。未运行时返回 false。
    pub fn stop(&self) -> bool {
        let _lifecycle = self.inner.lock_lifecycle();
        if !self.inner.running.swap(false, Ordering::SeqCst) {
            return false;
        }
        self.inner.epoch.send_modify(|e| *e += 1);
        info!(path = %self.inner.path.display(), "node watcher stopped");
        self.inner.bus.emit(&WatchEvent::Stopped);
        true
    }

    /// 立即执行一次检查，返回内容是否变化
    pub async fn check_once(&self) -> Result<bool> {
        self.inner.check_once().await
    }
}

impl Inner {
    fn lock_lifecycle(&self) -> std::sync::MutexGuard<'_, ()> {
        match self.lifecycle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn current_hash(&self) -> String {
        match self.last_hash.lock() {
            Ok(h) => h.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_hash(&self, hash: String) -> String {
        let mut guard = match self.last_hash.lock() {
            Ok(h) => h,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, hash)
    }

    async fn check_once(&self) -> Result<bool> {
        let _check = self.check_lock.lock().await;

        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to read node file");
                self.bus.emit(&WatchEvent::Error {
                    message: format!("{}: {}", self.path.display(), e),
                });
                return Err(e.into());
            }
        };

        let current = format!("{:x}", Md5::digest(&content));
        if current == self.current_hash() {
            return Ok(false);
        }
        let previous = self.set_hash(current.clone());

        info!(
            path = %self.path.display(),
            previous = %previous,
            current = %current,
            "node file changed"
        );
        self.bus.emit(&WatchEvent::NodesChanged {
            previous_hash: previous,
            current_hash: current,
        });

        match self.updater.apply(&self.path).await {
            Ok(summary) => {
                info!(summary = %summary, "update applied");
                self.bus.emit(&WatchEvent::UpdateSucceeded { summary });
            }
            Err(e) => {
                error!(error = %e, "update failed");
                self.bus.emit(&WatchEvent::UpdateFailed {
                    error: e.to_string(),
                });
            }
        }
        Ok(true)
    }
}

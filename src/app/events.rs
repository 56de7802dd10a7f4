//! 监视器事件与同步监听者注册表

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde::Serialize;

/// 监视器对外发出的事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum WatchEvent {
    Started {
        path: PathBuf,
    },
    Stopped,
    #[serde(rename_all = "camelCase")]
    NodesChanged {
        previous_hash: String,
        current_hash: String,
    },
    UpdateSucceeded {
        summary: String,
    },
    UpdateFailed {
        error: String,
    },
    Error {
        message: String,
    },
}

impl WatchEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WatchEvent::Started { .. } => "started",
            WatchEvent::Stopped => "stopped",
            WatchEvent::NodesChanged { .. } => "nodesChanged",
            WatchEvent::UpdateSucceeded { .. } => "updateSuccess",
            WatchEvent::UpdateFailed { .. } => "updateFailed",
            WatchEvent::Error { .. } => "error",
        }
    }
}

type Listener = Arc<dyn Fn(&WatchEvent) + Send + Sync>;

/// 监听者按注册顺序同步收到事件。
///
/// `emit` 先复制当前监听者列表再逐个调用，监听者内部可以再 `subscribe`，
/// 新注册的监听者从下一次 `emit` 开始生效。
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: Arc<RwLock<Vec<Listener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&WatchEvent) + Send + Sync + 'static,
    {
        let mut listeners = match self.listeners.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        listeners.push(Arc::new(listener));
    }

    pub fn emit(&self, event: &WatchEvent) {
        let snapshot: Vec<Listener> = match self.listeners.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for listener in &snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().map(|l| l.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn listeners_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let log = log.clone();
            bus.subscribe(move |ev| log.lock().unwrap().push(format!("{}:{}", id, ev.name())));
        }
        bus.emit(&WatchEvent::Stopped);

        assert_eq!(
            *log.lock().unwrap(),
            vec!["0:stopped", "1:stopped", "2:stopped"]
        );
    }

    #[test]
    fn listener_may_subscribe_during_emit() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handle = bus.clone();
        let outer_log = log.clone();
        bus.subscribe(move |ev| {
            outer_log.lock().unwrap().push(format!("outer:{}", ev.name()));
            if let WatchEvent::Stopped = ev {
                let inner_log = outer_log.clone();
                handle.subscribe(move |ev| inner_log.lock().unwrap().push(format!("inner:{}", ev.name())));
            }
        });

        bus.emit(&WatchEvent::Stopped);
        assert_eq!(bus.listener_count(), 2);
        assert_eq!(*log.lock().unwrap(), vec!["outer:stopped"]);

        bus.emit(&WatchEvent::Error {
            message: "x".into(),
        });
        assert_eq!(
            *log.lock().unwrap(),
            vec!["outer:stopped", "outer:error", "inner:error"]
        );
    }

    #[test]
    fn event_names_and_serialization() {
        let ev = WatchEvent::NodesChanged {
            previous_hash: String::new(),
            current_hash: "abc".to_string(),
        };
        assert_eq!(ev.name(), "nodesChanged");
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "nodesChanged");
        assert_eq!(json["currentHash"], "abc");
        assert_eq!(
            WatchEvent::UpdateFailed { error: "x".into() }.name(),
            "updateFailed"
        );
    }
}

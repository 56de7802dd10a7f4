pub mod merge;
pub mod names;
pub mod node;
pub mod registry;
pub mod subscription;
pub mod types;

use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};

pub use node::{Node, NodeType};
pub use types::Settings;

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("static regex")
});

/// 展开 `$VAR`、`${VAR}` 和 `${VAR:-default}`，未定义的变量替换为空串
pub fn expand_env_vars(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &Captures| {
            if let Some(name) = caps.get(1) {
                match (std::env::var(name.as_str()), caps.get(2)) {
                    (Ok(val), Some(_)) if !val.is_empty() => val,
                    (_, Some(default)) => default.as_str().to_string(),
                    (Ok(val), None) => val,
                    (Err(_), None) => String::new(),
                }
            } else {
                caps.get(3)
                    .and_then(|name| std::env::var(name.as_str()).ok())
                    .unwrap_or_default()
            }
        })
        .into_owned()
}

pub fn parse_settings(content: &str) -> Result<Settings> {
    let expanded = expand_env_vars(content);
    // 空文件等价于全部默认值
    let settings: Settings = if expanded.trim().is_empty() {
        Settings::default()
    } else {
        serde_yml::from_str(&expanded)?
    };
    settings.validate()?;
    Ok(settings)
}

pub fn load_settings(path: &str) -> Result<Settings> {
    let content = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("failed to read settings file {}", path))?;
    parse_settings(&content).with_context(|| format!("invalid settings file {}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{RestartMode, UpdateMode};

    #[test]
    fn empty_settings_use_defaults() {
        let settings = parse_settings("").unwrap();
        assert_eq!(settings.log.level, "info");
        assert_eq!(settings.watch.interval_secs, 5);
        assert_eq!(settings.update.mode, UpdateMode::Sync);
        assert_eq!(settings.restart.mode, RestartMode::Command);
        assert!(settings.api.is_none());
        assert!(settings.require_api().is_err());
    }

    #[test]
    fn env_vars_are_expanded() {
        std::env::set_var("NODESYNC_TEST_API", "http://127.0.0.1:9090");
        std::env::remove_var("NODESYNC_TEST_UNSET");
        let yaml = "api:\n  url: ${NODESYNC_TEST_API}\n  secret: ${NODESYNC_TEST_UNSET:-fallback}\nnodes:\n  path: $NODESYNC_TEST_UNSET/nodes.txt\n";
        let settings = parse_settings(yaml).unwrap();
        let api = settings.require_api().unwrap();
        assert_eq!(api.url, "http://127.0.0.1:9090");
        assert_eq!(api.secret.as_deref(), Some("fallback"));
        assert_eq!(settings.nodes.path, "/nodes.txt");
        std::env::remove_var("NODESYNC_TEST_API");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(parse_settings("watch:\n  interval_secs: 0\n").is_err());
        assert!(parse_settings("update:\n  mode: script\n").is_err());
        assert!(parse_settings("restart:\n  mode: command\n  command: []\n").is_err());
        assert!(parse_settings("api:\n  url: not a url\n").is_err());
        assert!(parse_settings("restart:\n  mode: none\n  command: []\n").is_ok());
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodesync.yaml");
        std::fs::write(
            &path,
            "log:\n  level: debug\nupdate:\n  mode: script\n  command: [\"python3\", \"zr.py\"]\nbackup:\n  path: /tmp/b.json\n",
        )
        .unwrap();
        let settings = load_settings(path.to_str().unwrap()).unwrap();
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.update.command, vec!["python3", "zr.py"]);
        assert!(settings.backup.is_some());
        assert!(load_settings(dir.path().join("missing.yaml").to_str().unwrap()).is_err());
    }
}

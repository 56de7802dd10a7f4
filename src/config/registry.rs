//! 原始链接字符串的校验、统计、去重和节点文件读写。
//!
//! 这里只做前缀级别的粗校验，不做完整解析。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use crate::common::error::Result;

use super::node::Node;
use super::subscription;

/// 默认预览长度
pub const DEFAULT_PREVIEW_LEN: usize = 80;

/// 前缀级链接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Vmess,
    Ss,
    Trojan,
    Vless,
    Unknown,
}

impl LinkKind {
    pub fn detect(link: &str) -> Self {
        if link.starts_with("vmess://") {
            LinkKind::Vmess
        } else if link.starts_with("ss://") {
            LinkKind::Ss
        } else if link.starts_with("trojan://") {
            LinkKind::Trojan
        } else if link.starts_with("vless://") {
            LinkKind::Vless
        } else {
            LinkKind::Unknown
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validation {
    pub valid: bool,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total: usize,
    pub vmess: usize,
    pub ss: usize,
    pub trojan: usize,
    pub vless: usize,
    pub unknown: usize,
}

/// 节点文件校验结果，错误按 1 起始的行号给出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileValidation {
    pub valid: bool,
    pub errors: Vec<String>,
}

pub fn validate_node(link: &str) -> Validation {
    let link = link.trim();
    if link.is_empty() {
        return Validation {
            valid: false,
            kind: LinkKind::Unknown,
            error: Some("empty node link".to_string()),
        };
    }
    match LinkKind::detect(link) {
        LinkKind::Unknown => Validation {
            valid: false,
            kind: LinkKind::Unknown,
            error: Some("unsupported node type".to_string()),
        },
        kind => Validation {
            valid: true,
            kind,
            error: None,
        },
    }
}

pub fn validate_nodes<S: AsRef<str>>(links: &[S]) -> Vec<Validation> {
    links.iter().map(|l| validate_node(l.as_ref())).collect()
}

pub fn filter_valid<S: AsRef<str>>(links: &[S]) -> Vec<String> {
    links
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| validate_node(l).valid)
        .map(|l| l.trim().to_string())
        .collect()
}

pub fn type_stats<S: AsRef<str>>(links: &[S]) -> NodeStats {
    let mut stats = NodeStats {
        total: links.len(),
        ..NodeStats::default()
    };
    for link in links {
        match validate_node(link.as_ref()).kind {
            LinkKind::Vmess => stats.vmess += 1,
            LinkKind::Ss => stats.ss += 1,
            LinkKind::Trojan => stats.trojan += 1,
            LinkKind::Vless => stats.vless += 1,
            LinkKind::Unknown => stats.unknown += 1,
        }
    }
    stats
}

/// 去重（裁剪后按字符串精确比较，丢弃空串）。
///
/// 当前实现保留首次出现的顺序，但调用方只能依赖集合语义。
pub fn deduplicate<S: AsRef<str>>(links: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .filter(|l| seen.insert(l.to_string()))
        .map(str::to_string)
        .collect()
}

/// 裁剪并去掉空行，保持原顺序
pub fn format_nodes<S: AsRef<str>>(links: &[S]) -> Vec<String> {
    links
        .iter()
        .map(|l| l.as_ref().trim())
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// 按行拆分节点文件内容，跳过空行和 `#` 注释
pub fn parse_node_content(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn generate_node_file_content<S: AsRef<str>>(links: &[S]) -> String {
    format_nodes(links).join("\n")
}

pub fn is_duplicate<S: AsRef<str>>(existing: &[S], link: &str) -> bool {
    let link = link.trim();
    existing.iter().any(|l| l.as_ref().trim() == link)
}

pub fn add_nodes<S: AsRef<str>, T: AsRef<str>>(existing: &[S], new: &[T]) -> Vec<String> {
    let combined: Vec<&str> = existing
        .iter()
        .map(|l| l.as_ref())
        .chain(new.iter().map(|l| l.as_ref()))
        .collect();
    deduplicate(&combined)
}

pub fn remove_node<S: AsRef<str>>(links: &[S], target: &str) -> Vec<String> {
    let target = target.trim();
    links
        .iter()
        .map(|l| l.as_ref())
        .filter(|l| l.trim() != target)
        .map(str::to_string)
        .collect()
}

/// 去掉首尾空白后，超过 `max_len` 个字符时截断并追加 `...`
pub fn preview(text: &str, max_len: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len).collect();
    out.push_str("...");
    out
}

pub fn validate_node_file(content: &str) -> FileValidation {
    let mut errors = Vec::new();
    let mut valid_lines = 0usize;

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let result = validate_node(line);
        if result.valid {
            valid_lines += 1;
        } else {
            errors.push(format!(
                "line {}: {}",
                idx + 1,
                result.error.unwrap_or_default()
            ));
        }
    }

    if valid_lines == 0 && errors.is_empty() {
        errors.push("no valid node links found".to_string());
    }
    FileValidation {
        valid: errors.is_empty(),
        errors,
    }
}

/// 节点列表文件
#[derive(Debug, Clone)]
pub struct NodeFile {
    path: PathBuf,
}

impl NodeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取链接列表；文件不存在时返回空列表
    pub async fn read(&self) -> Result<Vec<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(parse_node_content(&content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "node file missing, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn write<S: AsRef<str>>(&self, links: &[S]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, generate_node_file_content(links)).await?;
        Ok(())
    }

    /// 读取并解析为节点记录
    pub async fn load_nodes(&self) -> Result<Vec<Node>> {
        let links = self.read().await?;
        Ok(subscription::parse_links(&links.join("\n")).nodes)
    }
}

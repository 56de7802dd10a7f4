//! 把新节点合并进路由器配置文档（`proxies` + `proxy-groups`）。
//!
//! 所有操作都原地修改传入的文档，需要保留原文档的调用方自行 clone。

use std::collections::HashSet;

use serde_json::Value;
use tracing::warn;

use crate::common::error::{Error, Result};

use super::node::Node;

pub const DIRECT: &str = "DIRECT";
pub const REJECT: &str = "REJECT";

const PROXIES: &str = "proxies";
const PROXY_GROUPS: &str = "proxy-groups";

pub fn is_reserved(name: &str) -> bool {
    name == DIRECT || name == REJECT
}

/// 代理组类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Select,
    UrlTest,
    Fallback,
    LoadBalance,
    Other,
}

impl GroupKind {
    pub fn parse(s: &str) -> Self {
        match s {
            "select" => GroupKind::Select,
            "url-test" => GroupKind::UrlTest,
            "fallback" => GroupKind::Fallback,
            "load-balance" => GroupKind::LoadBalance,
            _ => GroupKind::Other,
        }
    }

    /// 只有这四类组会注入新节点
    pub fn accepts_nodes(self) -> bool {
        !matches!(self, GroupKind::Other)
    }
}

/// Append nodes whose name is not yet in `proxies`.
///
/// Returns the names actually added, in input order. Running it twice with
/// the same nodes adds nothing the second time.
pub fn merge_proxies(doc: &mut Value, nodes: &[Node]) -> Result<Vec<String>> {
    let proxies = sequence_mut(doc, PROXIES)?;
    let mut existing: HashSet<String> = proxies
        .iter()
        .filter_map(|p| entry_name(p).map(str::to_string))
        .collect();

    let mut added = Vec::new();
    for node in nodes {
        if !existing.insert(node.name.clone()) {
            continue;
        }
        proxies.push(node.to_proxy_value());
        added.push(node.name.clone());
    }
    Ok(added)
}

/// Rebuild the member list of every eligible group as
/// reserved entries, then existing entries, then `added` names not yet present.
///
/// Returns the names of the groups that were rebuilt. A group whose member
/// list is not a sequence is left untouched and not reported.
pub fn merge_groups<S: AsRef<str>>(doc: &mut Value, added: &[S]) -> Result<Vec<String>> {
    let groups = sequence_mut(doc, PROXY_GROUPS)?;
    let mut updated = Vec::new();

    for group in groups.iter_mut() {
        let Some(obj) = group.as_object_mut() else {
            continue;
        };
        let kind = obj
            .get("type")
            .and_then(Value::as_str)
            .map(GroupKind::parse)
            .unwrap_or(GroupKind::Other);
        if !kind.accepts_nodes() {
            continue;
        }
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let current = match obj.get("proxies") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(list)) => list.clone(),
            Some(_) => {
                warn!(group = %name, "group proxies is not a sequence, skipping");
                continue;
            }
        };

        let mut reserved = Vec::new();
        let mut members = Vec::new();
        let mut present = HashSet::new();
        for entry in current {
            match entry.as_str() {
                Some(r) if is_reserved(r) => {
                    // 保留项只留第一次出现
                    if !reserved.iter().any(|v: &Value| v.as_str() == Some(r)) {
                        reserved.push(entry);
                    }
                }
                Some(n) => {
                    present.insert(n.to_string());
                    members.push(entry);
                }
                None => members.push(entry),
            }
        }
        for new_name in added {
            let new_name = new_name.as_ref();
            if is_reserved(new_name) || !present.insert(new_name.to_string()) {
                continue;
            }
            members.push(Value::String(new_name.to_string()));
        }

        reserved.extend(members);
        obj.insert("proxies".to_string(), Value::Array(reserved));
        updated.push(name);
    }
    Ok(updated)
}

/// 向指定组追加一个代理名；组不存在时报错。返回是否实际追加。
pub fn add_proxy_to_group(doc: &mut Value, group: &str, proxy: &str) -> Result<bool> {
    let groups = sequence_mut(doc, PROXY_GROUPS)?;
    let target = groups
        .iter_mut()
        .find(|g| entry_name(g) == Some(group))
        .and_then(Value::as_object_mut)
        .ok_or_else(|| Error::GroupNotFound(group.to_string()))?;

    let members = target
        .entry("proxies")
        .or_insert_with(|| Value::Array(Vec::new()));
    if members.is_null() {
        *members = Value::Array(Vec::new());
    }
    let members = members.as_array_mut().ok_or_else(|| {
        Error::InvalidDocument(format!("proxies of group `{}` is not a sequence", group))
    })?;

    if members.iter().any(|m| m.as_str() == Some(proxy)) {
        return Ok(false);
    }
    members.push(Value::String(proxy.to_string()));
    Ok(true)
}

/// 从给定的组中移除代理名，`DIRECT`/`REJECT` 永远不会被移除。
/// 返回实际发生变化的组名。
pub fn remove_proxy_from_groups<S: AsRef<str>>(
    doc: &mut Value,
    proxy: &str,
    groups: &[S],
) -> Result<Vec<String>> {
    if is_reserved(proxy) {
        return Ok(Vec::new());
    }
    let wanted: HashSet<&str> = groups.iter().map(|g| g.as_ref()).collect();
    let mut changed = Vec::new();

    for group in sequence_mut(doc, PROXY_GROUPS)?.iter_mut() {
        let Some(name) = entry_name(group).map(str::to_string) else {
            continue;
        };
        if !wanted.contains(name.as_str()) {
            continue;
        }
        if let Some(members) = group.get_mut("proxies").and_then(Value::as_array_mut) {
            let before = members.len();
            members.retain(|m| m.as_str() != Some(proxy));
            if members.len() != before {
                changed.push(name);
            }
        }
    }
    Ok(changed)
}

/// 同名代理原位替换，否则追加。返回是否发生了替换。
pub fn upsert_proxy(doc: &mut Value, node: &Node) -> Result<bool> {
    let proxies = sequence_mut(doc, PROXIES)?;
    let value = node.to_proxy_value();
    match proxies
        .iter()
        .position(|p| entry_name(p) == Some(node.name.as_str()))
    {
        Some(idx) => {
            proxies[idx] = value;
            Ok(true)
        }
        None => {
            proxies.push(value);
            Ok(false)
        }
    }
}

/// 取出顶层序列；缺失或为 null 时创建空序列
fn sequence_mut<'a>(doc: &'a mut Value, key: &str) -> Result<&'a mut Vec<Value>> {
    let map = doc
        .as_object_mut()
        .ok_or_else(|| Error::InvalidDocument("configuration is not a mapping".to_string()))?;
    let entry = map.entry(key.to_string()).or_insert(Value::Null);
    if entry.is_null() {
        *entry = Value::Array(Vec::new());
    }
    entry
        .as_array_mut()
        .ok_or_else(|| Error::InvalidDocument(format!("`{}` is not a sequence", key)))
}

fn entry_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str)
}

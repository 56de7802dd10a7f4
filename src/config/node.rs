use std::fmt;

use serde::{Deserialize, Serialize};

/// 节点协议类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Vmess,
    Vless,
    Ss,
    Ssr,
    Trojan,
    Http,
    Socks5,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Vmess => "vmess",
            NodeType::Vless => "vless",
            NodeType::Ss => "ss",
            NodeType::Ssr => "ssr",
            NodeType::Trojan => "trojan",
            NodeType::Http => "http",
            NodeType::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single proxy endpoint, serialized the way the router expects an
/// entry of its `proxies` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub server: String,
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "alterId", default, skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub security: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,
}

impl Node {
    /// 创建只含必填字段的节点，其余协议字段为空
    pub fn new(
        name: impl Into<String>,
        node_type: NodeType,
        server: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            name: name.into(),
            node_type,
            server: server.into(),
            port,
            password: None,
            cipher: None,
            uuid: None,
            alter_id: None,
            security: None,
            network: None,
            tls: None,
            sni: None,
            path: None,
            host: None,
            protocol: None,
            obfs: None,
            username: None,
            plugin: None,
        }
    }

    /// 名称、地址、端口齐全才算有效节点
    pub fn is_valid(&self) -> bool {
        !self.name.is_empty() && !self.server.is_empty() && self.port != 0
    }

    /// 转换为配置文档中的代理条目
    pub fn to_proxy_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

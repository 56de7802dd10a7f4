use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// 名称中允许保留的字符：ASCII 字母数字、下划线、短横线、常用汉字
static DISALLOWED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_\-\x{4e00}-\x{9fa5}]").expect("static regex"));

/// 名称截断长度（按字符计）
pub const MAX_NAME_CHARS: usize = 24;

/// 单次批量解析内的名称分配器
///
/// 每次批量解析都必须新建一个实例，已分配的名称不会跨批次保留。
#[derive(Debug, Default)]
pub struct NameResolver {
    seen: HashSet<String>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// 清洗原始名称并保证在本批次内唯一。
    /// 清洗后为空时使用 `fallback`。
    pub fn resolve(&mut self, raw: &str, fallback: &str) -> String {
        let mut base = sanitize(raw);
        if base.is_empty() {
            base = sanitize(fallback);
        }

        let mut candidate = base.clone();
        let mut counter = 1;
        while self.seen.contains(&candidate) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        self.seen.insert(candidate.clone());
        candidate
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.seen.contains(name)
    }
}

/// Strip disallowed characters and truncate to [`MAX_NAME_CHARS`].
pub fn sanitize(raw: &str) -> String {
    DISALLOWED
        .replace_all(raw, "")
        .chars()
        .take(MAX_NAME_CHARS)
        .collect()
}

//! # Graph 模块
//!
//! 对话图（节点集合）的加载。
//!
//! 支持三种输入：
//!
//! - Yarn 编辑器导出的 JSON 数组：`[{ "title": ..., "tags": ..., "body": ... }]`
//! - 包装形式：`{ "nodes": [...] }`
//! - Yarn 文本格式：
//!
//! ```text
//! title: Start
//! tags: intro camera(2,3)
//! ---
//! Alice: Hello!
//! ===
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use tracing::warn;

use crate::error::LoadError;

/// 对话节点（分支）的元数据与正文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    /// 节点标题（唯一标识）
    pub title: String,
    /// 标签列表
    pub tags: Vec<String>,
    /// 原始正文
    pub body: String,
}

impl NodeInfo {
    /// 创建节点
    pub fn new(title: impl Into<String>, tags: Vec<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            tags,
            body: body.into(),
        }
    }
}

/// 标签字段：空格分隔的字符串或字符串数组
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagsField {
    Text(String),
    List(Vec<String>),
}

impl Default for TagsField {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagsField {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::Text(text) => split_tags(&text),
            Self::List(list) => list
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawNode {
    title: String,
    #[serde(default)]
    tags: TagsField,
    #[serde(default)]
    body: String,
}

#[derive(Debug, Deserialize)]
struct RawWrapper {
    nodes: Vec<RawNode>,
}

/// 对话图
#[derive(Debug, Clone, Default)]
pub struct DialogueGraph {
    nodes: Vec<NodeInfo>,
    index: HashMap<String, usize>,
    duplicates: Vec<String>,
}

impl DialogueGraph {
    /// 从节点列表构建
    ///
    /// 标题重复时后出现的节点覆盖先出现的节点（保留先出现的位置）。
    pub fn from_nodes(nodes: impl IntoIterator<Item = NodeInfo>) -> Result<Self, LoadError> {
        let mut graph = Self::default();
        for node in nodes {
            let title = node.title.trim().to_string();
            if title.is_empty() {
                return Err(LoadError::InvalidGraph("节点缺少标题".to_string()));
            }
            let node = NodeInfo { title, ..node };
            match graph.index.get(&node.title) {
                Some(&i) => {
                    warn!(branch = %node.title, "对话图中存在重复的节点标题，后者覆盖前者");
                    graph.duplicates.push(node.title.clone());
                    graph.nodes[i] = node;
                }
                None => {
                    graph.index.insert(node.title.clone(), graph.nodes.len());
                    graph.nodes.push(node);
                }
            }
        }
        Ok(graph)
    }

    /// 解析文本（JSON 或 Yarn 文本格式）
    pub fn parse(text: &str) -> Result<Self, LoadError> {
        let trimmed = text.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let value: serde_json::Value =
                serde_json::from_str(text).map_err(|e| LoadError::Json(e.to_string()))?;
            Self::from_value(&value)
        } else {
            Self::from_nodes(parse_yarn_text(text)?)
        }
    }

    /// 从 JSON 值构建
    ///
    /// 字符串值按文本再解析一次（场景变量中存放的是序列化后的 JSON）。
    pub fn from_value(value: &serde_json::Value) -> Result<Self, LoadError> {
        let raw_nodes = match value {
            serde_json::Value::String(text) => return Self::parse(text),
            serde_json::Value::Array(_) => Vec::<RawNode>::deserialize(value)
                .map_err(|e| LoadError::InvalidGraph(e.to_string()))?,
            serde_json::Value::Object(_) => {
                RawWrapper::deserialize(value)
                    .map_err(|e| LoadError::InvalidGraph(e.to_string()))?
                    .nodes
            }
            other => {
                return Err(LoadError::InvalidGraph(format!(
                    "期望节点数组，实际为 {}",
                    json_kind(other)
                )));
            }
        };

        Self::from_nodes(
            raw_nodes
                .into_iter()
                .map(|raw| NodeInfo::new(raw.title, raw.tags.into_vec(), raw.body)),
        )
    }

    /// 按标题查找节点
    pub fn get(&self, title: &str) -> Option<&NodeInfo> {
        self.index.get(title).map(|&i| &self.nodes[i])
    }

    /// 是否包含节点
    pub fn contains(&self, title: &str) -> bool {
        self.index.contains_key(title)
    }

    /// 所有节点（按首次出现顺序）
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.nodes
    }

    /// 所有标题
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(|n| n.title.as_str())
    }

    /// 加载时被覆盖的重复标题
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    /// 节点数量
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl IntoIterator for DialogueGraph {
    type Item = NodeInfo;
    type IntoIter = std::vec::IntoIter<NodeInfo>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

fn split_tags(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "布尔值",
        serde_json::Value::Number(_) => "数字",
        serde_json::Value::String(_) => "字符串",
        serde_json::Value::Array(_) => "数组",
        serde_json::Value::Object(_) => "对象",
    }
}

/// 解析 Yarn 文本格式
fn parse_yarn_text(text: &str) -> Result<Vec<NodeInfo>, LoadError> {
    let mut nodes = Vec::new();
    let mut title: Option<String> = None;
    let mut tags: Vec<String> = Vec::new();
    let mut body: Option<Vec<&str>> = None;

    for (idx, line) in text.lines().enumerate() {
        let line_number = idx + 1;

        if let Some(lines) = body.as_mut() {
            if line.trim() == "===" {
                let node_title = title.take().ok_or_else(|| {
                    LoadError::InvalidGraph(format!("第 {} 行：节点缺少 title 头", line_number))
                })?;
                nodes.push(NodeInfo::new(
                    node_title,
                    std::mem::take(&mut tags),
                    lines.join("\n"),
                ));
                body = None;
            } else {
                lines.push(line);
            }
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "---" {
            body = Some(Vec::new());
            continue;
        }
        match trimmed.split_once(':') {
            Some((key, value)) => match key.trim() {
                "title" => title = Some(value.trim().to_string()),
                "tags" => tags = split_tags(value),
                // 其余头部字段（position、colorID 等）忽略
                _ => {}
            },
            None => {
                return Err(LoadError::InvalidGraph(format!(
                    "第 {} 行：无法识别的头部行 '{}'",
                    line_number, trimmed
                )));
            }
        }
    }

    if body.is_some() {
        return Err(LoadError::InvalidGraph(
            "最后一个节点缺少结束标记 '==='".to_string(),
        ));
    }

    Ok(nodes)
}

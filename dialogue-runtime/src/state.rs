//! # State 模块
//!
//! 对话的持久状态：变量表与已访问分支集合。
//!
//! ## 设计原则
//!
//! - 所有状态必须**显式建模**
//! - 所有状态必须**可序列化**（支持存档/读档）
//! - 变量名不包含 `$` 前缀，嵌套变量使用 `.` 分隔（如 `a.alice.name`）

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// 对话变量值
///
/// 序列化时不带标签，与存档格式中的标量一一对应。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    /// 布尔值
    Bool(bool),
    /// 数字
    Number(f64),
    /// 字符串
    String(String),
}

impl VarValue {
    /// 类型名（用于错误信息）
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Bool",
            Self::Number(_) => "Number",
            Self::String(_) => "String",
        }
    }

    /// 作为布尔值
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 作为数字
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// 作为字符串切片
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for VarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            // 整数值不带小数部分（1.0 显示为 "1"）
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for VarValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for VarValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for VarValue {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for VarValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for VarValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// 变量表
///
/// 以完整键名存储，嵌套结构通过 `.` 分隔的键名表达。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VariableStore {
    data: BTreeMap<String, VarValue>,
}

impl VariableStore {
    /// 创建空变量表
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取变量
    pub fn get(&self, key: &str) -> Option<&VarValue> {
        self.data.get(key)
    }

    /// 设置变量
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<VarValue>) {
        self.data.insert(key.into(), value.into());
    }

    /// 变量是否存在
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// 删除变量本身及其所有 `key.` 开头的子变量
    ///
    /// 返回被删除的条目数。
    pub fn remove_tree(&mut self, key: &str) -> usize {
        let child_prefix = format!("{}.", key);
        let before = self.data.len();
        self.data
            .retain(|k, _| k != key && !k.starts_with(&child_prefix));
        before - self.data.len()
    }

    /// 获取嵌套变量的直接子键（去重，按字典序）
    ///
    /// `a.alice.name` 与 `a.alice.color` 对于 `a` 返回 `["alice"]`。
    pub fn child_keys(&self, key: &str) -> Vec<String> {
        let prefix = format!("{}.", key);
        let keys: BTreeSet<&str> = self
            .data
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('.').next())
            .filter(|child| !child.is_empty())
            .collect();
        keys.into_iter().map(str::to_string).collect()
    }

    /// 清空
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// 变量数量
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 遍历所有变量
    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarValue)> {
        self.data.iter()
    }

    /// 导出为有序映射
    pub fn to_map(&self) -> BTreeMap<String, VarValue> {
        self.data.clone()
    }

    /// 以映射整体替换
    pub fn replace(&mut self, data: BTreeMap<String, VarValue>) {
        self.data = data;
    }
}

/// 已访问分支集合
///
/// 存档格式为 `{title: bool}`，值恒为 `true`。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisitedBranches {
    data: BTreeMap<String, bool>,
}

impl VisitedBranches {
    /// 创建空集合
    pub fn new() -> Self {
        Self::default()
    }

    /// 标记为已访问
    pub fn mark(&mut self, title: impl Into<String>) {
        self.data.insert(title.into(), true);
    }

    /// 是否已访问
    pub fn contains(&self, title: &str) -> bool {
        self.data.get(title).copied().unwrap_or(false)
    }

    /// 已访问标题（按字典序）
    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.data
            .iter()
            .filter(|(_, visited)| **visited)
            .map(|(title, _)| title.as_str())
    }

    /// 清空
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// 导出为有序映射
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        self.data.clone()
    }

    /// 以映射整体替换
    pub fn replace(&mut self, data: BTreeMap<String, bool>) {
        self.data = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_var_value_display() {
        assert_eq!(VarValue::Number(1.0).to_string(), "1");
        assert_eq!(VarValue::Number(2.5).to_string(), "2.5");
        assert_eq!(VarValue::Bool(true).to_string(), "true");
        assert_eq!(VarValue::from("abc").to_string(), "abc");
    }

    #[test]
    fn test_var_value_untagged_serde() {
        let json = serde_json::to_string(&VarValue::Number(3.0)).unwrap();
        assert_eq!(json, "3.0");

        let v: VarValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, VarValue::Bool(true));
        let v: VarValue = serde_json::from_str("7").unwrap();
        assert_eq!(v, VarValue::Number(7.0));
        let v: VarValue = serde_json::from_str("\"x\"").unwrap();
        assert_eq!(v, VarValue::String("x".to_string()));
    }

    #[test]
    fn test_remove_tree_only_exact_and_children() {
        let mut store = VariableStore::new();
        store.set("a.bob", "1");
        store.set("a.bob.name", "Bob");
        store.set("a.bobby.name", "Bobby");

        let removed = store.remove_tree("a.bob");
        assert_eq!(removed, 2);
        assert!(!store.contains("a.bob"));
        assert!(!store.contains("a.bob.name"));
        assert!(store.contains("a.bobby.name"));
    }

    #[test]
    fn test_child_keys() {
        let mut store = VariableStore::new();
        store.set("a.alice.id", "alice");
        store.set("a.alice.name", "Alice");
        store.set("a.bob.id", "bob");
        store.set("ab", 1);

        assert_eq!(store.child_keys("a"), vec!["alice", "bob"]);
        assert_eq!(store.child_keys("a.alice"), vec!["id", "name"]);
        assert!(store.child_keys("missing").is_empty());
    }

    #[test]
    fn test_visited_titles() {
        let mut visited = VisitedBranches::new();
        visited.mark("Start");
        visited.mark("End");
        assert!(visited.contains("Start"));
        assert!(!visited.contains("Middle"));
        assert_eq!(visited.titles().collect::<Vec<_>>(), vec!["End", "Start"]);
    }
}

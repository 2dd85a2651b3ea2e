//! # Save 模块
//!
//! 对话持久状态（变量表 + 已访问分支）的存档格式。
//!
//! ```json
//! {
//!   "variables": { "gold": 10, "a.alice.name": "Alice" },
//!   "visited": { "Start": true }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::state::{VarValue, VariableStore, VisitedBranches};

/// 对话存档数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DialogueSave {
    /// 变量表
    #[serde(default)]
    pub variables: BTreeMap<String, VarValue>,
    /// 已访问分支
    #[serde(default)]
    pub visited: BTreeMap<String, bool>,
}

impl DialogueSave {
    /// 从当前状态创建存档
    pub fn capture(variables: &VariableStore, visited: &VisitedBranches) -> Self {
        Self {
            variables: variables.to_map(),
            visited: visited.to_map(),
        }
    }

    /// 将存档写回状态（整体替换）
    pub fn restore_into(self, variables: &mut VariableStore, visited: &mut VisitedBranches) {
        variables.replace(self.variables);
        visited.replace(self.visited);
    }

    /// 序列化为 JSON 字符串
    pub fn to_json(&self) -> Result<String, SaveError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 转换为 JSON 值
    pub fn to_value(&self) -> Result<serde_json::Value, SaveError> {
        serde_json::to_value(self).map_err(|e| SaveError::SerializationFailed(e.to_string()))
    }

    /// 从 JSON 字符串反序列化
    pub fn from_json(json: &str) -> Result<Self, SaveError> {
        if json.trim().is_empty() {
            return Err(SaveError::Empty);
        }
        serde_json::from_str(json).map_err(|e| SaveError::DeserializationFailed(e.to_string()))
    }

    /// 从 JSON 值反序列化
    ///
    /// 字符串值按 JSON 文本再解析一次（场景变量中存放的通常是字符串）。
    pub fn from_value(value: &serde_json::Value) -> Result<Self, SaveError> {
        match value {
            serde_json::Value::Null => Err(SaveError::Empty),
            serde_json::Value::String(text) => Self::from_json(text),
            other => Self::deserialize(other)
                .map_err(|e| SaveError::DeserializationFailed(e.to_string())),
        }
    }
}

/// 存档错误
#[derive(Debug, Clone, PartialEq)]
pub enum SaveError {
    /// 序列化失败
    SerializationFailed(String),
    /// 反序列化失败
    DeserializationFailed(String),
    /// 存档为空
    Empty,
}

impl std::fmt::Display for SaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveError::SerializationFailed(e) => write!(f, "序列化失败: {}", e),
            SaveError::DeserializationFailed(e) => write!(f, "反序列化失败: {}", e),
            SaveError::Empty => write!(f, "存档为空"),
        }
    }
}

impl std::error::Error for SaveError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_and_restore() {
        let mut variables = VariableStore::new();
        variables.set("gold", 10);
        variables.set("name", "Alice");
        let mut visited = VisitedBranches::new();
        visited.mark("Start");

        let save = DialogueSave::capture(&variables, &visited);
        let json = save.to_json().unwrap();

        let mut restored_vars = VariableStore::new();
        restored_vars.set("stale", true);
        let mut restored_visited = VisitedBranches::new();
        DialogueSave::from_json(&json)
            .unwrap()
            .restore_into(&mut restored_vars, &mut restored_visited);

        assert_eq!(restored_vars, variables);
        assert!(!restored_vars.contains("stale"));
        assert!(restored_visited.contains("Start"));
    }

    #[test]
    fn test_payload_shape() {
        let json = r#"{"variables":{"gold":10,"met":true,"who":"bob"},"visited":{"Start":true}}"#;
        let save = DialogueSave::from_json(json).unwrap();
        assert_eq!(save.variables.get("gold"), Some(&VarValue::Number(10.0)));
        assert_eq!(save.variables.get("met"), Some(&VarValue::Bool(true)));
        assert_eq!(save.visited.get("Start"), Some(&true));
    }

    #[test]
    fn test_from_value_accepts_string() {
        let value = serde_json::Value::String(r#"{"variables":{},"visited":{}}"#.to_string());
        assert_eq!(DialogueSave::from_value(&value).unwrap(), DialogueSave::default());
    }

    #[test]
    fn test_empty_and_malformed() {
        assert_eq!(DialogueSave::from_json("  "), Err(SaveError::Empty));
        assert_eq!(
            DialogueSave::from_value(&serde_json::Value::Null),
            Err(SaveError::Empty)
        );
        assert!(matches!(
            DialogueSave::from_json("{not json"),
            Err(SaveError::DeserializationFailed(_))
        ));
    }
}

//! 变量查询与存档
//!
//! 键名可带或不带脚本中的 `$` 前缀。

use serde_json::Value;
use tracing::{debug, error, info};

use super::DialogueSession;
use crate::runtime::DialogueRunner;
use crate::save::{DialogueSave, SaveError};
use crate::state::VarValue;

fn var_key(key: &str) -> &str {
    key.strip_prefix('$').unwrap_or(key)
}

impl<R: DialogueRunner> DialogueSession<R> {
    /// 获取变量
    pub fn get_variable(&self, key: &str) -> Option<&VarValue> {
        self.runner.variables().get(var_key(key))
    }

    /// 设置变量
    pub fn set_variable(&mut self, key: &str, value: impl Into<VarValue>) {
        let value = value.into();
        debug!(key, %value, "设置变量");
        self.runner.variables_mut().set(var_key(key), value);
    }

    /// 变量是否等于 `value`
    pub fn compare_variable(&self, key: &str, value: &VarValue) -> bool {
        self.get_variable(key) == Some(value)
    }

    /// 变量是否存在
    pub fn get_variable_exists(&self, key: &str) -> bool {
        self.runner.variables().contains(var_key(key))
    }

    /// 嵌套变量的直接子键
    pub fn get_child_keys_of_nested_variable(&self, key: &str) -> Vec<String> {
        self.runner.variables().child_keys(var_key(key))
    }

    /// 直接子键个数
    pub fn get_keys_count(&self, key: &str) -> usize {
        self.get_child_keys_of_nested_variable(key).len()
    }

    /// 指定位置的子键
    pub fn get_child_key_via_index(&self, key: &str, index: usize) -> Option<String> {
        self.get_child_keys_of_nested_variable(key)
            .into_iter()
            .nth(index)
    }

    /// 删除变量及其所有子变量
    pub fn delete_dialogue_state_variable(&mut self, key: &str) {
        let removed = self.runner.variables_mut().remove_tree(var_key(key));
        debug!(key, removed, "删除变量");
    }

    /// 当前对话状态存档
    pub fn save_state(&self) -> DialogueSave {
        DialogueSave::capture(self.runner.variables(), self.runner.visited())
    }

    /// 当前对话状态存档（JSON 值）
    pub fn save_state_value(&self) -> Value {
        self.save_state().to_value().unwrap_or_else(|e| {
            error!(error = %e, "保存对话状态失败");
            Value::Null
        })
    }

    /// 从 JSON 值恢复对话状态
    ///
    /// 存档为空或格式错误时记录日志，状态不变。
    pub fn load_state(&mut self, value: &Value) {
        match DialogueSave::from_value(value) {
            Ok(save) => self.load_state_from(save),
            Err(SaveError::Empty) => error!("对话状态存档为空，未加载"),
            Err(e) => error!(error = %e, "加载对话状态失败"),
        }
    }

    /// 从存档恢复对话状态（整体替换变量与已访问集合）
    pub fn load_state_from(&mut self, save: DialogueSave) {
        let variables = save.variables.len();
        let visited = save.visited.len();
        let DialogueSave {
            variables: data,
            visited: titles,
        } = save;
        self.runner.variables_mut().replace(data);
        self.runner.visited_mut().replace(titles);
        info!(variables, visited, "对话状态已恢复");
    }

    /// 清空变量与已访问集合
    pub fn clear_state(&mut self) {
        self.runner.variables_mut().clear();
        self.runner.visited_mut().clear();
        debug!("对话状态已清空");
    }
}

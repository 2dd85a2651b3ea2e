//! 说话者与角色变量
//!
//! 角色以变量树 `a.<id>.*` 存储，`a.<id>.id` 存在即视为角色已登记。

use tracing::{debug, warn};

use super::{DialogueSession, LineType};
use crate::runtime::DialogueRunner;
use crate::state::VarValue;

fn actor_key(id: &str, key: &str) -> String {
    format!("a.{}.{}", id, key)
}

impl<R: DialogueRunner> DialogueSession<R> {
    /// 角色是否已登记
    pub fn get_actor_exists(&self, id: &str) -> bool {
        !id.is_empty() && self.runner.variables().contains(&actor_key(id, "id"))
    }

    /// 登记新角色；已存在时不做任何事
    pub fn create_new_actor(&mut self, id: &str, name: &str, color: &str) {
        if id.is_empty() || self.get_actor_exists(id) {
            return;
        }
        let variables = self.runner.variables_mut();
        variables.set(actor_key(id, "id"), id);
        variables.set(actor_key(id, "name"), name);
        variables.set(actor_key(id, "color"), color);
        debug!(actor = id, "登记角色");
    }

    /// 删除角色及其全部信息
    pub fn delete_actor(&mut self, id: &str) {
        if id.is_empty() {
            return;
        }
        self.delete_dialogue_state_variable(&format!("a.{}", id));
    }

    /// 设置角色信息；`id` 字段不可修改
    pub fn set_actor_info(&mut self, id: &str, key: &str, value: impl Into<VarValue>) {
        if key == "id" {
            warn!(actor = id, "角色的 id 字段不可修改");
            return;
        }
        if !self.get_actor_exists(id) {
            return;
        }
        self.runner.variables_mut().set(actor_key(id, key), value);
    }

    /// 角色信息
    pub fn get_actor_info(&self, id: &str, key: &str) -> Option<&VarValue> {
        if !self.get_actor_exists(id) {
            return None;
        }
        self.runner.variables().get(&actor_key(id, key))
    }

    /// 当前说话者的信息
    pub fn get_active_actor_info(&self, key: &str) -> Option<&VarValue> {
        let id = self.get_active_line_actor_id();
        self.get_actor_info(id, key)
    }

    /// 当前行是否有说话者
    pub fn line_has_active_actor(&self) -> bool {
        self.running && self.speaker.is_some()
    }

    /// 当前说话者 id
    pub fn get_active_line_actor_id(&self) -> &str {
        match &self.speaker {
            Some(speaker) if self.running => speaker.id.as_str(),
            _ => "",
        }
    }

    /// 当前说话者的行参数（`tom happy: ...` 中的 `happy`）
    pub fn get_active_line_actor_parameters(&self) -> &[String] {
        match &self.speaker {
            Some(speaker) if self.running => speaker.parameters.as_slice(),
            _ => &[],
        }
    }

    /// 行参数个数
    pub fn get_active_line_parameters_count(&self) -> usize {
        self.get_active_line_actor_parameters().len()
    }

    /// 指定行参数；越界返回空串
    pub fn get_active_line_parameter_via_index(&self, index: usize) -> &str {
        self.get_active_line_actor_parameters()
            .get(index)
            .map_or("", String::as_str)
    }

    /// 当前文本行是否带有行参数 `query`
    pub fn get_active_line_parameter_exists(&self, query: &str) -> bool {
        self.line_type == Some(LineType::Text)
            && self
                .get_active_line_actor_parameters()
                .iter()
                .any(|p| p == query)
    }
}

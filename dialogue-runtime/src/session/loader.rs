//! 加载对话图、开始分支、异步资源

use serde_json::Value;
use tracing::{debug, error, info};

use super::DialogueSession;
use crate::error::LoadError;
use crate::graph::DialogueGraph;
use crate::resource::{JsonResourceManager, JsonResponder, LoadedResource};
use crate::runtime::{DialogueRunner, LineKind};

impl<R: DialogueRunner> DialogueSession<R> {
    /// 从序列化文本（JSON 或 Yarn 文本）加载对话图
    ///
    /// 不会开始播放。变量与已访问集合保留。
    pub fn load_graph(&mut self, serialized: &str) -> Result<(), LoadError> {
        let graph = DialogueGraph::parse(serialized)?;
        self.load_dialogue_graph(&graph)
    }

    /// 加载已解析的对话图
    ///
    /// 正在播放的对话会被停止。
    pub fn load_dialogue_graph(&mut self, graph: &DialogueGraph) -> Result<(), LoadError> {
        self.runner.load(graph)?;
        if self.running {
            self.stop_running_dialogue();
        }
        info!(nodes = graph.len(), "对话图加载完成");
        Ok(())
    }

    /// 从场景变量加载对话图，成功后从 `start` 开始（为空则不开始）
    pub fn load_from_scene_variable(&mut self, value: &Value, start: &str) {
        let loaded = DialogueGraph::from_value(value).and_then(|g| self.load_dialogue_graph(&g));
        match loaded {
            Ok(()) => {
                if !start.is_empty() {
                    self.start_from(start);
                }
            }
            Err(e) => error!(error = %e, "从场景变量加载对话失败"),
        }
    }

    /// 通过资源管理器异步加载 JSON 对话图
    ///
    /// 立即返回；结果在下一次 `is_running` / `end_frame` / `poll_resources` 时生效。
    pub fn load_from_json_file<M: JsonResourceManager>(
        &mut self,
        resources: &mut M,
        name: &str,
        start: &str,
    ) {
        debug!(resource = name, start, "请求加载对话资源");
        let responder = JsonResponder::new(
            name.to_string(),
            start.to_string(),
            self.load_sender.clone(),
        );
        resources.load_json(name, responder);
    }

    /// 应用所有已完成的资源加载
    pub fn poll_resources(&mut self) {
        while let Ok(loaded) = self.load_receiver.try_recv() {
            self.apply_loaded(loaded);
        }
    }

    fn apply_loaded(&mut self, loaded: LoadedResource) {
        let value = match loaded.result {
            Ok(Value::Null) => {
                debug!("资源内容为空，忽略");
                return;
            }
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "加载对话资源失败");
                return;
            }
        };

        // 解析失败时仍按原程序开始
        if let Err(e) = DialogueGraph::from_value(&value).and_then(|g| self.load_dialogue_graph(&g))
        {
            error!(error = %e, "对话资源解析失败");
        }
        if !loaded.start.is_empty() {
            self.start_from(&loaded.start);
        }
    }

    /// 是否存在指定分支
    pub fn has_dialogue_branch(&self, title: &str) -> bool {
        self.runner.has_node(title)
    }

    /// 从指定分支开始对话
    ///
    /// 分支不存在时不做任何事。
    pub fn start_from(&mut self, title: &str) {
        if !self.runner.has_node(title) {
            debug!(branch = title, "分支不存在，忽略开始请求");
            return;
        }

        self.reset_dialogue_fields();
        self.running = false;
        if let Err(e) = self.runner.run(title) {
            error!(branch = title, error = %e, "开始对话失败");
            return;
        }

        self.lookahead = self.pull_line();
        if let Some(line) = &self.lookahead {
            self.branch = Some(line.node.clone());
            self.line_type = match line.kind {
                LineKind::Text(_) => Some(super::LineType::Text),
                LineKind::Options(_) => Some(super::LineType::Options),
                LineKind::Command(_) => Some(super::LineType::Command),
                LineKind::Unknown => None,
            };
        }

        info!(branch = title, "开始对话");
        self.running = true;
        self.go_to_next_dialogue_line();
    }
}

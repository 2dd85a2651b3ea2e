//! # Runner 模块
//!
//! 会话层与解释器之间的接缝。

use crate::error::{LoadError, RuntimeError};
use crate::graph::DialogueGraph;
use crate::runtime::line::DialogueLine;
use crate::state::{VariableStore, VisitedBranches};

/// 对话解释器
///
/// 按行拉取执行结果：每次 `next_line` 返回下一行，`None` 表示对话结束。
/// 返回选项行后，必须先调用 `select` 才能继续拉取。
pub trait DialogueRunner {
    /// 加载对话图，替换当前程序并清除执行位置
    ///
    /// 失败时保留原程序。变量表与已访问集合不受影响。
    fn load(&mut self, graph: &DialogueGraph) -> Result<(), LoadError>;

    /// 是否存在指定节点
    fn has_node(&self, title: &str) -> bool;

    /// 所有节点标题
    fn node_titles(&self) -> Vec<String>;

    /// 从指定节点开始执行
    fn run(&mut self, start: &str) -> Result<(), RuntimeError>;

    /// 拉取下一行
    fn next_line(&mut self) -> Result<Option<DialogueLine>, RuntimeError>;

    /// 选择选项
    fn select(&mut self, index: usize) -> Result<(), RuntimeError>;

    /// 变量表
    fn variables(&self) -> &VariableStore;

    /// 变量表（可变）
    fn variables_mut(&mut self) -> &mut VariableStore;

    /// 已访问节点
    fn visited(&self) -> &VisitedBranches;

    /// 已访问节点（可变）
    fn visited_mut(&mut self) -> &mut VisitedBranches;
}

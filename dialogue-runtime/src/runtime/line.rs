//! # Line 模块
//!
//! 解释器向会话层交付的“对话行”。

use std::sync::Arc;

use crate::graph::NodeInfo;

/// 行内容
///
/// 解释器边界上一次性判定的类型，会话层只按此分派。
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// 文本
    Text(String),
    /// 选项列表（等待选择）
    Options(Vec<String>),
    /// 命令（原始文本，如 `wait 500`）
    Command(String),
    /// 无法识别的结果
    Unknown,
}

/// 对话行
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueLine {
    /// 行内容
    pub kind: LineKind,
    /// 所属节点
    pub node: Arc<NodeInfo>,
    /// 在节点正文中的行号（从 1 开始）
    pub line_num: usize,
}

impl DialogueLine {
    /// 创建对话行
    pub fn new(kind: LineKind, node: Arc<NodeInfo>, line_num: usize) -> Self {
        Self {
            kind,
            node,
            line_num,
        }
    }

    /// 所属节点标题
    pub fn title(&self) -> &str {
        &self.node.title
    }

    /// 是否与另一行来自同一节点的同一源行
    pub fn same_source(&self, title: &str, line_num: Option<usize>) -> bool {
        line_num == Some(self.line_num) && self.node.title == title
    }
}

//! # Error 模块
//!
//! 定义 dialogue-runtime 中使用的错误类型。
//!
//! 面向事件层的会话接口不会向外抛出这些错误（只记录日志），
//! 底层入口（图加载、解释器、存档）返回 `Result` 便于宿主和测试检查。

use thiserror::Error;

use crate::resource::ResourceError;
use crate::script::EvalError;

/// 节点正文解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 无效的行格式
    #[error("第 {line} 行：无效的格式 - {message}")]
    InvalidLine { line: usize, message: String },

    /// 块没有闭合（如 `<<if>>` 缺少 `<<endif>>`）
    #[error("第 {line} 行：'{keyword}' 块没有闭合")]
    UnclosedBlock { line: usize, keyword: String },

    /// 出现在错误位置的关键字（如孤立的 `<<else>>`）
    #[error("第 {line} 行：意外的 '{keyword}'")]
    UnexpectedKeyword { line: usize, keyword: String },

    /// 无效的表达式
    #[error("第 {line} 行：无效的表达式 - {message}")]
    InvalidExpression { line: usize, message: String },
}

impl ParseError {
    /// 错误所在的正文行号
    pub fn line(&self) -> usize {
        match self {
            Self::InvalidLine { line, .. }
            | Self::UnclosedBlock { line, .. }
            | Self::UnexpectedKeyword { line, .. }
            | Self::InvalidExpression { line, .. } => *line,
        }
    }
}

/// 对话图加载错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    /// JSON 格式错误
    #[error("对话数据不是合法的 JSON: {0}")]
    Json(String),

    /// 图结构无效（缺少标题、节点不是对象等）
    #[error("无效的对话图: {0}")]
    InvalidGraph(String),

    /// 节点正文解析失败
    #[error("节点 '{title}' 解析失败: {source}")]
    Body {
        title: String,
        #[source]
        source: ParseError,
    },

    /// 资源读取失败
    #[error("资源加载失败: {0}")]
    Resource(#[from] ResourceError),
}

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 节点未找到
    #[error("节点 '{title}' 未找到")]
    NodeNotFound { title: String },

    /// 无效的选择索引
    #[error("无效的选择索引 {index}，有效范围是 0..{max}")]
    InvalidChoiceIndex { index: usize, max: usize },

    /// 当前没有等待选择的选项
    #[error("当前没有等待选择的选项")]
    NotAwaitingSelection,

    /// 选项尚未选择，不能继续
    #[error("必须先选择一个选项才能继续")]
    AwaitingSelection,

    /// 执行步数超限（如没有输出的跳转环）
    #[error("节点 '{node}' 执行了 {steps} 步仍未产生输出")]
    StepLimitExceeded { node: String, steps: usize },

    /// 表达式求值失败
    #[error("节点 '{node}' 第 {line} 行：{source}")]
    Eval {
        node: String,
        line: usize,
        #[source]
        source: EvalError,
    },
}

/// dialogue-runtime 统一错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DialogueError {
    /// 加载错误
    #[error("加载错误: {0}")]
    Load(#[from] LoadError),

    /// 运行时错误
    #[error("运行时错误: {0}")]
    Runtime(#[from] RuntimeError),

    /// 存档错误
    #[error("存档错误: {0}")]
    Save(#[from] crate::save::SaveError),
}

/// Result 类型别名
pub type DialogueResult<T> = Result<T, DialogueError>;

//! # AST 模块
//!
//! 节点正文的抽象语法树。
//!
//! ## 设计说明
//!
//! AST 是解析器的输出，保留块结构（条件块、快捷选项组）。
//! 解释器在加载时把 AST 编译为扁平指令序列再执行。

use crate::script::expr::Expr;

/// 文本片段
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// 原样文本
    Text(String),
    /// 插值表达式 `{$var}`
    Interpolation(Expr),
    /// 行内命令 `<<cmd args>>`
    Command(String),
}

/// 条件分支（if / elseif / else）
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalBranch {
    /// 条件（`None` 表示 else）
    pub condition: Option<Expr>,
    /// 分支体
    pub body: Vec<Statement>,
    /// 关键字所在行号
    pub line: usize,
}

/// 快捷选项 `-> 文本 <<if 条件>>`
#[derive(Debug, Clone, PartialEq)]
pub struct ShortcutOption {
    /// 显示文本
    pub text: Vec<Segment>,
    /// 显示条件
    pub condition: Option<Expr>,
    /// 缩进的选项体
    pub body: Vec<Statement>,
    /// 行号
    pub line: usize,
}

/// 正文语句
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// 文本行（可能含插值和行内命令）
    Line { segments: Vec<Segment>, line: usize },

    /// 独立命令行 `<<cmd args>>`
    Command { text: String, line: usize },

    /// 变量赋值 `<<set $var to expr>>`
    ///
    /// 变量名不包含 `$` 前缀
    Set {
        variable: String,
        value: Expr,
        line: usize,
    },

    /// 条件块
    If {
        branches: Vec<ConditionalBranch>,
        line: usize,
    },

    /// 跳转 `<<jump Node>>` 或 `[[Node]]`
    Jump { target: String, line: usize },

    /// 结束对话 `<<stop>>`
    Stop { line: usize },

    /// 选项链接 `[[文本|Node]]`，节点结束时统一展示
    OptionLink {
        text: String,
        target: String,
        line: usize,
    },

    /// 快捷选项组
    ShortcutOptions {
        options: Vec<ShortcutOption>,
        line: usize,
    },
}

impl Statement {
    /// 语句所在行号
    pub fn line(&self) -> usize {
        match self {
            Self::Line { line, .. }
            | Self::Command { line, .. }
            | Self::Set { line, .. }
            | Self::If { line, .. }
            | Self::Jump { line, .. }
            | Self::Stop { line }
            | Self::OptionLink { line, .. }
            | Self::ShortcutOptions { line, .. } => *line,
        }
    }
}

/// 解析后的节点正文
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Body {
    pub statements: Vec<Statement>,
}

impl Body {
    /// 递归收集所有跳转与选项目标（含行号）
    pub fn targets(&self) -> Vec<(&str, usize)> {
        let mut out = Vec::new();
        collect_targets(&self.statements, &mut out);
        out
    }

    /// 正文是否没有任何语句
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}

fn collect_targets<'a>(statements: &'a [Statement], out: &mut Vec<(&'a str, usize)>) {
    for statement in statements {
        match statement {
            Statement::Jump { target, line } | Statement::OptionLink { target, line, .. } => {
                out.push((target.as_str(), *line));
            }
            Statement::If { branches, .. } => {
                for branch in branches {
                    collect_targets(&branch.body, out);
                }
            }
            Statement::ShortcutOptions { options, .. } => {
                for option in options {
                    collect_targets(&option.body, out);
                }
            }
            _ => {}
        }
    }
}

//! # 诊断模块
//!
//! 对话图静态检查，不依赖 IO 或会话。
//!
//! ## 检查项
//!
//! - 节点正文解析失败（Error）
//! - 跳转/选项目标节点不存在（Error）
//! - 标题重复（Warn）
//! - 正文为空（Info）

use std::collections::HashSet;

use crate::graph::DialogueGraph;
use crate::script::parse_body;

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DiagnosticLevel {
    /// 信息提示
    Info,
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 诊断条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 诊断级别
    pub level: DiagnosticLevel,
    /// 节点标题
    pub node: String,
    /// 正文行号（如果可定位，从 1 开始）
    pub line: Option<usize>,
    /// 诊断消息
    pub message: String,
    /// 诊断详情
    pub detail: Option<String>,
}

impl Diagnostic {
    fn new(level: DiagnosticLevel, node: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            node: node.into(),
            line: None,
            message: message.into(),
            detail: None,
        }
    }

    /// 创建错误诊断
    pub fn error(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Error, node, message)
    }

    /// 创建警告诊断
    pub fn warn(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Warn, node, message)
    }

    /// 创建信息诊断
    pub fn info(node: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(DiagnosticLevel::Info, node, message)
    }

    /// 设置行号
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// 设置详情
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.level, self.node)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(detail) = &self.detail {
            write!(f, "\n  | {}", detail)?;
        }
        Ok(())
    }
}

/// 诊断结果
#[derive(Debug, Clone, Default)]
pub struct DiagnosticResult {
    /// 诊断条目列表
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticResult {
    /// 创建空结果
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加诊断
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: DiagnosticResult) {
        self.diagnostics.extend(other.diagnostics);
    }

    fn count(&self, level: DiagnosticLevel) -> usize {
        self.diagnostics.iter().filter(|d| d.level == level).count()
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(DiagnosticLevel::Error)
    }

    /// 获取警告数量
    pub fn warn_count(&self) -> usize {
        self.count(DiagnosticLevel::Warn)
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// 按级别过滤
    pub fn filter_by_level(&self, min_level: DiagnosticLevel) -> Vec<&Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level >= min_level)
            .collect()
    }
}

/// 分析对话图，返回诊断结果
pub fn analyze_graph(graph: &DialogueGraph) -> DiagnosticResult {
    let mut result = DiagnosticResult::new();
    let defined: HashSet<&str> = graph.titles().collect();

    let mut reported = HashSet::new();
    for title in graph.duplicates() {
        if reported.insert(title.as_str()) {
            result.push(
                Diagnostic::warn(title, "节点标题重复")
                    .with_detail("后出现的节点覆盖了先出现的节点"),
            );
        }
    }

    for node in graph.nodes() {
        let body = match parse_body(&node.body) {
            Ok(body) => body,
            Err(e) => {
                result.push(Diagnostic::error(&node.title, e.to_string()).with_line(e.line()));
                continue;
            }
        };

        if body.is_empty() {
            result.push(Diagnostic::info(&node.title, "节点正文为空"));
        }

        for (target, line) in body.targets() {
            if !defined.contains(target) {
                result.push(
                    Diagnostic::error(&node.title, format!("未定义的跳转目标: {}", target))
                        .with_line(line)
                        .with_detail(format!("jump 或选项引用了不存在的节点 '{}'", target)),
                );
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeInfo;

    fn graph(nodes: &[(&str, &str)]) -> DialogueGraph {
        DialogueGraph::from_nodes(
            nodes
                .iter()
                .map(|(title, body)| NodeInfo::new(*title, vec![], *body)),
        )
        .unwrap()
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::error("Start", "未定义的跳转目标")
            .with_line(3)
            .with_detail("[[Missing]]");

        let display = format!("{}", diag);
        assert!(display.contains("[ERROR]"));
        assert!(display.contains("Start:3"));
        assert!(display.contains("\n  | [[Missing]]"));
    }

    #[test]
    fn test_valid_graph_is_clean() {
        let result = analyze_graph(&graph(&[
            ("Start", "Hi\n[[Go|Next]]"),
            ("Next", "<<jump Start>>"),
        ]));
        assert!(result.is_empty());
    }

    #[test]
    fn test_missing_targets() {
        let result = analyze_graph(&graph(&[(
            "Start",
            "Hi\n<<if $x>>\n<<jump Nowhere>>\n<<endif>>\n-> Pick\n    [[Lost]]",
        )]));

        assert_eq!(result.error_count(), 2);
        assert!(result.diagnostics[0].message.contains("Nowhere"));
        assert_eq!(result.diagnostics[0].line, Some(3));
        assert!(result.diagnostics[1].message.contains("Lost"));
    }

    #[test]
    fn test_parse_error_and_empty_body() {
        let result = analyze_graph(&graph(&[("Broken", "<<if $x>>\nA"), ("Empty", "")]));

        assert!(result.has_errors());
        let errors = result.filter_by_level(DiagnosticLevel::Error);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].node, "Broken");
        assert_eq!(errors[0].line, Some(1));

        assert_eq!(result.filter_by_level(DiagnosticLevel::Info).len(), 2);
    }

    #[test]
    fn test_duplicate_titles_warn() {
        let result = analyze_graph(&graph(&[("A", "x"), ("A", "y"), ("A", "z")]));
        assert_eq!(result.warn_count(), 1);
        assert!(!result.has_errors());
    }

    #[test]
    fn test_merge() {
        let mut a = DiagnosticResult::new();
        a.push(Diagnostic::info("A", "a"));
        let mut b = DiagnosticResult::new();
        b.push(Diagnostic::warn("B", "b"));
        a.merge(b);
        assert_eq!(a.diagnostics.len(), 2);
    }
}

//! # Parser 模块
//!
//! 两阶段节点正文解析器实现（手写递归下降，无 regex 依赖）。
//!
//! ## 架构
//!
//! ```text
//! 正文文本 → [阶段1: 行分类] → Vec<ClassifiedLine> → [阶段2: 结构解析] → Body
//! ```
//!
//! ## 模块结构
//!
//! - `helpers`: 辅助解析函数
//! - `expr_parser`: 表达式解析器
//! - `phase1`: 行分类
//! - `phase2`: 结构解析

mod expr_parser;
mod helpers;
mod phase1;
mod phase2;


use crate::error::ParseError;
use crate::script::ast::Body;

use phase1::classify_lines;
use phase2::Phase2Parser;

// 重新导出辅助函数供测试使用
pub use helpers::{parse_links, split_segments, split_trailing_condition, strip_command};

// 重新导出表达式解析函数
pub use expr_parser::parse_expression;

/// 节点正文解析器
#[derive(Debug, Default)]
pub struct Parser {
    warnings: Vec<String>,
}

impl Parser {
    /// 创建新的解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 解析节点正文
    ///
    /// 行号从正文第一行开始计为 1。
    pub fn parse(&mut self, body: &str) -> Result<Body, ParseError> {
        self.warnings.clear();

        let mut phase2 = Phase2Parser::new(classify_lines(body));
        let result = phase2.parse_all();
        self.warnings = std::mem::take(&mut phase2.warnings);

        Ok(Body {
            statements: result?,
        })
    }

    /// 获取解析过程中的警告
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// 解析节点正文（不关心警告时的便捷函数）
pub fn parse_body(body: &str) -> Result<Body, ParseError> {
    Parser::new().parse(body)
}

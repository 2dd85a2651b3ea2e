//! # Script 模块
//!
//! 节点正文解析相关功能，包括 AST、表达式和解析器实现。
//!
//! ## 模块结构
//!
//! - [`ast`]：正文抽象语法树定义
//! - [`expr`]：表达式与求值器
//! - [`parser`]：两阶段解析器实现

pub mod ast;
pub mod expr;
pub mod parser;

pub use ast::*;
pub use expr::{BinaryOp, EvalContext, EvalError, Expr, evaluate, evaluate_to_bool};
pub use parser::{Parser, parse_body, parse_expression};

//! # Runtime 模块
//!
//! 对话解释器：会话层使用的接缝和参考实现。
//!
//! ## 模块结构
//!
//! - [`line`]：解释器交付的对话行
//! - [`runner`]：`DialogueRunner` 接缝
//! - [`executor`]：参考解释器 `YarnRunner`

pub mod executor;
pub mod line;
pub mod runner;

pub use executor::YarnRunner;
pub use line::{DialogueLine, LineKind};
pub use runner::DialogueRunner;

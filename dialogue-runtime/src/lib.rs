//! # Dialogue Runtime
//!
//! 分支对话树的播放运行时。
//!
//! ## 架构概述
//!
//! `dialogue-runtime` 是纯逻辑核心，不依赖渲染，也不读取真实时间。
//! 宿主每帧轮询 [`DialogueSession`]，在玩家输入时推进或选择：
//!
//! ```text
//! Host                               DialogueSession             DialogueRunner
//!   │── load_graph / start_from ──────►│── load / run ─────────────►│
//!   │── scroll_clipped_text ──────────►│                            │
//!   │── is_command_called ────────────►│                            │
//!   │── go_to_next_dialogue_line ─────►│── next_line ──────────────►│
//!   │── confirm_select_option ────────►│── select ─────────────────►│
//!   │◄─ take_wait_requests ────────────│                            │
//!   │── resume_wait(ticket) ──────────►│                            │
//!   │── end_frame ────────────────────►│                            │
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! use dialogue_runtime::{DialogueSession, LineType};
//!
//! let mut session = DialogueSession::new();
//! session.load_graph(json)?;
//! session.start_from("Start");
//!
//! while session.is_running() {
//!     session.scroll_clipped_text();
//!     if session.is_command_called("shake") {
//!         host.shake();
//!     }
//!     if session.is_dialogue_line_type(LineType::Text) {
//!         host.draw(session.get_clipped_line_text());
//!     }
//!     session.end_frame();
//! }
//! ```
//!
//! ## 模块结构
//!
//! - [`graph`]：对话图（节点标题、标签、正文）
//! - [`script`]：节点正文解析（AST、表达式）
//! - [`runtime`]：解释器接缝与参考实现
//! - [`session`]：对话会话状态机
//! - [`state`]：变量表与已访问集合
//! - [`save`]：存档格式
//! - [`timer`]：`<<wait>>` 计时
//! - [`resource`]：异步 JSON 资源
//! - [`diagnostic`]：对话图静态检查
//! - [`error`]：错误类型定义

pub mod diagnostic;
pub mod error;
pub mod graph;
pub mod resource;
pub mod runtime;
pub mod save;
pub mod script;
pub mod session;
pub mod state;
pub mod timer;

// 重导出核心类型
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult, analyze_graph};
pub use error::{DialogueError, DialogueResult, LoadError, ParseError, RuntimeError};
pub use graph::{DialogueGraph, NodeInfo};
pub use resource::{FsJsonResources, JsonResourceManager, JsonResponder, ResourceError};
pub use runtime::{DialogueLine, DialogueRunner, LineKind, YarnRunner};
pub use save::{DialogueSave, SaveError};
pub use session::{DialogueSession, LineType, PendingCommand};
pub use state::{VarValue, VariableStore, VisitedBranches};
pub use timer::{CommandId, WaitClock, WaitRequest, WaitTicket};

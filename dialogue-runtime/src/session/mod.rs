//! # Session 模块
//!
//! 对话会话：在解释器之上实现逐行推进、打字机式显示、命令触发和选项选择。
//!
//! ## 驱动模型
//!
//! ```text
//! Host (每帧)                       DialogueSession
//!   │── scroll_clipped_text() ─────►│ 显示游标 +1 / 遇到 wait 暂停
//!   │── is_command_called(name) ───►│ 消费已触发的命令
//!   │── go_to_next_dialogue_line() ►│ 推进到下一行
//!   │── take_wait_requests() ──────►│ 宿主计时，到期后 resume_wait()
//!   │── end_frame() ───────────────►│ 刷新边沿检测快照
//! ```
//!
//! 会话本身不读取时间，也不做渲染。所有面向脚本层的操作都不返回错误，
//! 失败只记录日志。
//!
//! ## 模块结构
//!
//! - `loader`：加载对话图、开始分支、异步资源
//! - `stepper`：逐行推进状态机
//! - `reveal`：显示游标、命令触发与 wait 暂停
//! - `options`：选项查询与选择
//! - `branch`：分支/标签查询与边沿检测
//! - `actor`：说话者与角色变量
//! - `variables`：变量查询与存档

mod actor;
mod branch;
mod loader;
mod options;
mod reveal;
mod stepper;
mod variables;

#[cfg(test)]
mod tests;

use std::str::FromStr;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::graph::NodeInfo;
use crate::resource::LoadedResource;
use crate::runtime::{DialogueLine, DialogueRunner, YarnRunner};
use crate::timer::{CommandId, WaitRequest, WaitTicket};

/// 对话行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineType {
    /// 文本
    Text,
    /// 选项
    Options,
    /// 命令
    Command,
}

impl FromStr for LineType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "options" => Ok(Self::Options),
            "command" => Ok(Self::Command),
            other => Err(format!("未知的行类型: '{}'", other)),
        }
    }
}

/// 排队等待触发的命令
#[derive(Debug, Clone, PartialEq)]
pub struct PendingCommand {
    id: CommandId,
    name: String,
    parameters: Vec<String>,
    offset: usize,
}

impl PendingCommand {
    /// 命令标识
    pub fn id(&self) -> CommandId {
        self.id
    }

    /// 命令名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 完整参数列表（第一个元素是命令名）
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }

    /// 触发位置（显示游标达到此值后可触发）
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// 当前行的说话者
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSpeaker {
    id: String,
    parameters: Vec<String>,
}

/// 上一帧的快照（边沿检测用）
#[derive(Debug, Clone, Default)]
struct FrameSnapshot {
    speaker: Option<ActiveSpeaker>,
    branch_title: Option<String>,
}

/// 对话会话
pub struct DialogueSession<R: DialogueRunner = YarnRunner> {
    runner: R,
    running: bool,
    /// 每次开始/停止递增，使旧的 wait 凭据失效
    generation: u64,
    /// 预取的下一行
    lookahead: Option<DialogueLine>,

    line_type: Option<LineType>,
    branch: Option<Arc<NodeInfo>>,
    line_num: Option<usize>,

    text: String,
    /// 显示游标（字符数）
    cursor: usize,
    /// 说话者前缀之后的起始位置（字符数）
    clip_start: usize,
    speaker: Option<ActiveSpeaker>,

    commands: Vec<PendingCommand>,
    next_command_id: CommandId,
    command_parameters: Vec<String>,
    paused: Option<WaitTicket>,
    wait_requests: Vec<WaitRequest>,

    options: Vec<String>,
    selected: Option<usize>,
    selection_changed: bool,

    tag_parameters: Vec<String>,
    previous: FrameSnapshot,

    load_sender: Sender<LoadedResource>,
    load_receiver: Receiver<LoadedResource>,
}

impl DialogueSession<YarnRunner> {
    /// 使用参考解释器创建会话
    pub fn new() -> Self {
        Self::with_runner(YarnRunner::new())
    }
}

impl Default for DialogueSession<YarnRunner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: DialogueRunner> DialogueSession<R> {
    /// 使用指定解释器创建会话
    pub fn with_runner(runner: R) -> Self {
        let (load_sender, load_receiver) = mpsc::channel();
        Self {
            runner,
            running: false,
            generation: 0,
            lookahead: None,
            line_type: None,
            branch: None,
            line_num: None,
            text: String::new(),
            cursor: 0,
            clip_start: 0,
            speaker: None,
            commands: Vec::new(),
            next_command_id: 0,
            command_parameters: Vec::new(),
            paused: None,
            wait_requests: Vec::new(),
            options: Vec::new(),
            selected: None,
            selection_changed: false,
            tag_parameters: Vec::new(),
            previous: FrameSnapshot::default(),
            load_sender,
            load_receiver,
        }
    }

    /// 解释器
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// 解释器（可变）
    pub fn runner_mut(&mut self) -> &mut R {
        &mut self.runner
    }

    /// 清空本次对话的临时状态（不影响变量与已访问集合）
    fn reset_dialogue_fields(&mut self) {
        self.generation += 1;
        self.lookahead = None;
        self.line_type = None;
        self.line_num = None;
        self.text.clear();
        self.cursor = 0;
        self.clip_start = 0;
        self.speaker = None;
        self.commands.clear();
        self.command_parameters.clear();
        self.paused = None;
        self.wait_requests.clear();
        self.options.clear();
        self.selected = None;
        self.selection_changed = false;
        self.tag_parameters.clear();
    }
}

/// 字符数
fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// 按字符截取子串 `[start, start + len)`
fn char_slice(s: &str, start: usize, len: usize) -> &str {
    let byte_at = |n: usize| s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    let begin = byte_at(start);
    let end = s[begin..]
        .char_indices()
        .nth(len)
        .map_or(s.len(), |(i, _)| begin + i);
    &s[begin..end]
}

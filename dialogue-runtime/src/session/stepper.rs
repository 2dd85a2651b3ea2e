//! 逐行推进状态机
//!
//! 会话始终持有一行预取结果（lookahead）。推进时按其类型分派：
//!
//! - 文本：与上一行同源（同节点、同行号）时追加，否则替换并解析说话者
//! - 选项：展示选项，预取保持不变，直到确认选择
//! - 命令：入队后继续推进
//! - 无法识别：停在原处
//! - 没有更多行：停止对话

use tracing::{debug, error};

use super::{ActiveSpeaker, DialogueSession, LineType, PendingCommand, char_len};
use crate::runtime::{DialogueLine, DialogueRunner, LineKind};

/// 单次推进最多连续处理的命令行数
const MAX_DRAINED_COMMANDS: usize = 10_000;

impl<R: DialogueRunner> DialogueSession<R> {
    /// 推进到下一行
    ///
    /// 暂停或未运行时无效。
    pub fn go_to_next_dialogue_line(&mut self) {
        if self.paused.is_some() || !self.running {
            return;
        }

        self.options.clear();
        self.selected = None;
        self.selection_changed = false;

        let mut drained = 0;
        loop {
            let Some(line) = self.lookahead.take() else {
                self.stop_running_dialogue();
                return;
            };

            match line.kind {
                LineKind::Text(ref piece) => {
                    let piece = piece.clone();
                    self.step_text(&line, &piece);
                    self.lookahead = self.pull_line();
                    return;
                }
                LineKind::Options(ref options) => {
                    self.commands.clear();
                    self.text.clear();
                    self.cursor = 0;
                    self.options = options.clone();
                    self.selection_changed = true;
                    self.speaker = None;
                    self.clip_start = 0;
                    self.line_type = Some(LineType::Options);
                    self.branch = Some(line.node.clone());
                    self.line_num = None;
                    self.lookahead = Some(line);
                    return;
                }
                LineKind::Command(ref text) => {
                    drained += 1;
                    if drained > MAX_DRAINED_COMMANDS {
                        error!(
                            branch = line.title(),
                            limit = MAX_DRAINED_COMMANDS,
                            "连续的命令行过多，结束对话"
                        );
                        self.stop_running_dialogue();
                        return;
                    }

                    // 独立的命令行没有说话者；行内命令保留所在行的说话者
                    let inline = self
                        .branch
                        .as_ref()
                        .is_some_and(|branch| line.same_source(&branch.title, self.line_num));
                    if !inline {
                        self.speaker = None;
                        self.clip_start = 0;
                    }
                    self.enqueue_command(text);
                    self.line_type = Some(LineType::Command);
                    self.lookahead = self.pull_line();
                }
                LineKind::Unknown => {
                    debug!(branch = line.title(), "无法识别的对话行");
                    self.line_type = None;
                    self.lookahead = Some(line);
                    return;
                }
            }
        }
    }

    fn step_text(&mut self, line: &DialogueLine, piece: &str) {
        let continuation = self
            .branch
            .as_ref()
            .is_some_and(|branch| line.same_source(&branch.title, self.line_num));

        if continuation {
            self.cursor = char_len(&self.text).saturating_sub(1);
            if !self.text.is_empty() {
                self.text.push(' ');
            }
            self.text.push_str(piece);
        } else {
            self.text = piece.to_string();
            self.cursor = 0;
            // 上一行遗留的命令从本行开头触发
            for command in &mut self.commands {
                command.offset = 0;
            }
            self.parse_speaker(piece);
        }

        self.line_type = Some(LineType::Text);
        self.branch = Some(line.node.clone());
        self.line_num = Some(line.line_num);
    }

    /// 解析 `actorId [参数...]: 文本` 形式的说话者前缀
    ///
    /// 只有已登记的角色才算说话者。
    fn parse_speaker(&mut self, text: &str) {
        self.speaker = None;
        self.clip_start = 0;

        let Some((head, _)) = text.split_once(':') else {
            return;
        };
        let mut words = head.split_whitespace();
        let Some(id) = words.next() else {
            return;
        };
        if !self.get_actor_exists(id) {
            return;
        }

        self.clip_start = char_len(head) + 1;
        self.speaker = Some(ActiveSpeaker {
            id: id.to_string(),
            parameters: words.map(str::to_string).collect(),
        });
    }

    fn enqueue_command(&mut self, text: &str) {
        let parameters: Vec<String> = text.split_whitespace().map(str::to_string).collect();
        let Some(name) = parameters.first().cloned() else {
            return;
        };

        // 紧跟在 wait 之后的命令要等 wait 结束
        let after_wait = self.commands.last().is_some_and(|c| c.name == "wait");
        let offset = char_len(&self.text) + usize::from(after_wait);
        let id = self.next_command_id;
        self.next_command_id += 1;

        debug!(command = text, offset, "命令入队");
        self.commands.push(PendingCommand {
            id,
            name,
            parameters,
            offset,
        });
    }

    /// 从解释器拉取下一行，出错时记录日志并视为结束
    pub(super) fn pull_line(&mut self) -> Option<DialogueLine> {
        match self.runner.next_line() {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "对话执行出错，结束对话");
                None
            }
        }
    }

    /// 立即停止对话
    pub fn stop_running_dialogue(&mut self) {
        if self.running {
            debug!("对话结束");
        }
        self.running = false;
        self.reset_dialogue_fields();
    }

    /// 对话是否在运行
    ///
    /// 会先应用已完成的资源加载；最后一行显示完毕且没有后续时，对话在此结束。
    pub fn is_running(&mut self) -> bool {
        self.poll_resources();
        if self.running
            && self.lookahead.is_none()
            && !self.text.is_empty()
            && self.cursor >= char_len(&self.text)
        {
            self.stop_running_dialogue();
        }
        self.running
    }
}

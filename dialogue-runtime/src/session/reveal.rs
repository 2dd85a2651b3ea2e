//! 显示游标、命令触发与 wait 暂停
//!
//! 命令在显示游标到达其触发位置（或游标处于行首）时被触发。
//! 触发的 `wait` 会暂停显示，直到宿主用凭据恢复。

use std::time::Duration;

use tracing::{debug, warn};

use super::{DialogueSession, LineType, PendingCommand, char_len, char_slice};
use crate::runtime::{DialogueRunner, LineKind};
use crate::timer::{CommandId, WaitClock, WaitRequest, WaitTicket};

impl<R: DialogueRunner> DialogueSession<R> {
    /// 显示游标前进一个字符
    ///
    /// 遇到阻塞的 `wait` 时暂停；文本已全部显示且下一行是同一源行拆出的命令时自动推进。
    pub fn scroll_clipped_text(&mut self) {
        if self.paused.is_some() || !self.running {
            return;
        }
        self.arm_reached_wait();
        if self.paused.is_some() {
            return;
        }

        if self.line_type == Some(LineType::Text)
            && self.lookahead_is_inline_command()
            && self.has_clipped_scrolling_completed()
        {
            self.go_to_next_dialogue_line();
            return;
        }

        if self.line_type == Some(LineType::Text) && self.cursor < char_len(&self.text) {
            self.cursor += 1;
        }
    }

    /// 立即显示全部文本
    pub fn complete_clipped_text_scrolling(&mut self) {
        if self.paused.is_some() || !self.running || self.text.is_empty() {
            return;
        }
        if self.line_type == Some(LineType::Text) {
            self.cursor = char_len(&self.text);
        }
    }

    /// 当前文本是否已全部显示
    pub fn has_clipped_scrolling_completed(&self) -> bool {
        self.running
            && !self.text.is_empty()
            && self.line_type == Some(LineType::Text)
            && self.cursor >= char_len(&self.text)
    }

    /// 当前行文本（去掉说话者前缀）
    pub fn get_text(&self) -> &str {
        if !self.running {
            return "";
        }
        char_slice(&self.text, self.clip_start, usize::MAX)
    }

    /// 已显示部分的文本
    pub fn get_clipped_line_text(&self) -> &str {
        char_slice(self.get_text(), 0, self.cursor + 1)
    }

    /// 完整的当前行文本，不经过逐字显示（会跳过 `wait`）
    pub fn get_line_text(&self) -> &str {
        self.get_text()
    }

    /// 下一行是否是与当前行同源的命令
    fn lookahead_is_inline_command(&self) -> bool {
        let Some(line) = &self.lookahead else {
            return false;
        };
        matches!(line.kind, LineKind::Command(_))
            && self
                .branch
                .as_ref()
                .is_some_and(|branch| line.same_source(&branch.title, self.line_num))
    }

    fn is_triggered(&self, command: &PendingCommand) -> bool {
        self.cursor == 0 || self.cursor >= command.offset
    }

    fn is_blocking_wait(&self, command: &PendingCommand) -> bool {
        command.name == "wait"
            && (self.paused.is_some_and(|t| t.command == command.id)
                || self.cursor == 0
                || self.cursor != char_len(&self.text))
    }

    /// 已触发、可被宿主处理的命令（按入队顺序，止于阻塞的 wait）
    pub fn peek_triggered_commands(&self) -> Vec<&PendingCommand> {
        if !self.running {
            return Vec::new();
        }
        self.commands
            .iter()
            .take_while(|c| self.is_triggered(c) && !self.is_blocking_wait(c))
            .collect()
    }

    /// 消费指定命令，其参数成为当前命令参数
    pub fn consume_command(&mut self, id: CommandId) -> bool {
        let Some(index) = self.commands.iter().position(|c| c.id == id) else {
            return false;
        };
        let command = self.commands.remove(index);
        if self.paused.is_some_and(|t| t.command == id) {
            self.paused = None;
        }
        debug!(command = %command.name, "命令已处理");
        self.command_parameters = command.parameters;
        true
    }

    /// 指定命令是否已触发；触发则消费它
    ///
    /// 没有匹配时，若显示已到达阻塞的 `wait`，则开始暂停。
    pub fn is_command_called(&mut self, name: &str) -> bool {
        if !self.running {
            return false;
        }
        let found = self
            .peek_triggered_commands()
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.id);
        if let Some(id) = found {
            return self.consume_command(id);
        }
        self.arm_reached_wait();
        false
    }

    /// 若显示已到达阻塞的 `wait`，开始暂停并产出等待请求
    fn arm_reached_wait(&mut self) {
        if self.paused.is_some() || !self.running {
            return;
        }
        let reached = self
            .commands
            .iter()
            .take_while(|c| self.is_triggered(c))
            .find(|c| self.is_blocking_wait(c))
            .map(|c| (c.id, wait_delay(c)));
        let Some((command, delay)) = reached else {
            return;
        };

        let ticket = WaitTicket {
            generation: self.generation,
            command,
        };
        debug!(?delay, "wait 开始");
        self.paused = Some(ticket);
        self.wait_requests.push(WaitRequest { ticket, delay });
    }

    /// 是否因 `wait` 暂停
    pub fn is_paused(&self) -> bool {
        self.paused.is_some()
    }

    /// 取走尚未交给宿主计时的等待请求
    pub fn take_wait_requests(&mut self) -> Vec<WaitRequest> {
        std::mem::take(&mut self.wait_requests)
    }

    /// 等待到期，恢复显示
    ///
    /// 过期的凭据（对话已重新开始或停止）会被忽略。
    pub fn resume_wait(&mut self, ticket: WaitTicket) -> bool {
        if !self.running || ticket.generation != self.generation || self.paused != Some(ticket) {
            debug!(?ticket, "忽略过期的 wait 凭据");
            return false;
        }
        self.paused = None;
        self.commands.retain(|c| c.id != ticket.command);
        debug!("wait 结束");
        true
    }

    /// 用 [`WaitClock`] 驱动等待：推进时间并登记新的请求
    pub fn pump_waits(&mut self, clock: &mut WaitClock, elapsed: Duration) {
        for ticket in clock.advance(elapsed) {
            self.resume_wait(ticket);
        }
        for request in self.take_wait_requests() {
            clock.arm(request);
        }
    }

    /// 当前行是否是指定类型
    ///
    /// 未暂停且有已触发的命令时，也视为命令行。
    pub fn is_dialogue_line_type(&self, line_type: LineType) -> bool {
        if !self.running {
            return false;
        }
        if line_type == LineType::Command
            && self.paused.is_none()
            && !self.peek_triggered_commands().is_empty()
        {
            return true;
        }
        self.line_type == Some(line_type)
    }

    /// 当前命令的参数个数（不含命令名）
    pub fn command_parameters_count(&self) -> usize {
        self.command_parameters.len().saturating_sub(1)
    }

    /// 当前命令的参数；`-1` 返回命令名
    pub fn get_command_parameter(&self, index: i64) -> &str {
        let Ok(position) = usize::try_from(index.saturating_add(1)) else {
            return "";
        };
        self.command_parameters
            .get(position)
            .map_or("", String::as_str)
    }

    /// 按 `key=value` 形式取参数值
    pub fn get_command_parameter_via_key(&self, key: &str) -> &str {
        if key.is_empty() {
            return "";
        }
        self.command_parameters
            .iter()
            .find(|p| p.split('=').next() == Some(key) && p.contains('='))
            .and_then(|p| p.split('=').nth(1))
            .unwrap_or("")
    }

    /// 当前命令是否有指定参数（`query` 或 `query=...`）
    pub fn command_has_parameter(&self, query: &str) -> bool {
        self.command_parameters.iter().any(|p| {
            p == query
                || p
                    .strip_prefix(query)
                    .is_some_and(|rest| rest.starts_with('='))
        })
    }
}

/// `wait <毫秒>` 的时长；无法解析时为零
fn wait_delay(command: &PendingCommand) -> Duration {
    let raw = command.parameters.get(1).map_or("", String::as_str);
    let digits: String = raw.chars().take_while(char::is_ascii_digit).collect();
    match digits.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            warn!(value = raw, "wait 时长无法解析，按 0 处理");
            Duration::ZERO
        }
    }
}

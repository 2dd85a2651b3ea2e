//! 选项查询与选择

use tracing::{debug, error};

use super::DialogueSession;
use crate::runtime::{DialogueRunner, LineKind};

impl<R: DialogueRunner> DialogueSession<R> {
    fn awaiting_options(&self) -> bool {
        self.running
            && self
                .lookahead
                .as_ref()
                .is_some_and(|line| matches!(line.kind, LineKind::Options(_)))
    }

    /// 选项个数
    pub fn get_line_options_count(&self) -> usize {
        if !self.running {
            return 0;
        }
        self.options.len()
    }

    /// 指定选项的文本；越界时取最后一个
    pub fn get_line_option(&self, index: usize) -> Option<&str> {
        if !self.running || self.options.is_empty() {
            return None;
        }
        let index = index.min(self.options.len() - 1);
        Some(self.options[index].as_str())
    }

    /// 所有选项拼成的文本，选中项前加 `cursor`，其余项以等宽空格对齐
    ///
    /// 纵向排列时每项后都带换行；横向排列时各项直接相连。
    pub fn get_line_options_text(&self, cursor: &str, add_new_line: bool) -> String {
        if !self.running || self.options.is_empty() {
            return String::new();
        }
        let padding = " ".repeat(cursor.chars().count());

        let mut text = String::new();
        for (i, option) in self.options.iter().enumerate() {
            if self.selected == Some(i) {
                text.push_str(cursor);
            } else {
                text.push_str(&padding);
            }
            text.push_str(option);
            if add_new_line {
                text.push('\n');
            }
        }
        text
    }

    /// 横向排列的选项文本
    pub fn get_line_options_text_horizontal(&self, cursor: &str) -> String {
        self.get_line_options_text(cursor, false)
    }

    /// 纵向排列的选项文本
    pub fn get_line_options_text_vertical(&self, cursor: &str) -> String {
        self.get_line_options_text(cursor, true)
    }

    /// 当前选中项
    pub fn get_selected_option(&self) -> Option<usize> {
        if !self.awaiting_options() {
            return None;
        }
        self.selected
    }

    /// 直接选中指定项；越界时取最后一个
    pub fn select_option(&mut self, index: usize) {
        if !self.awaiting_options() || self.options.is_empty() {
            return;
        }
        self.selected = Some(index.min(self.options.len() - 1));
        self.selection_changed = true;
    }

    /// 选中下一项（循环）
    pub fn select_next_option(&mut self) {
        if !self.awaiting_options() || self.options.is_empty() {
            return;
        }
        let count = self.options.len();
        self.selected = Some(match self.selected {
            None => 0,
            Some(i) => (i + 1) % count,
        });
        self.selection_changed = true;
    }

    /// 选中上一项（循环）
    pub fn select_previous_option(&mut self) {
        if !self.awaiting_options() || self.options.is_empty() {
            return;
        }
        let count = self.options.len();
        self.selected = Some(match self.selected {
            None | Some(0) => count - 1,
            Some(i) => i - 1,
        });
        self.selection_changed = true;
    }

    /// 选中项是否在上次查询后改变
    ///
    /// 查询会清除改变标记；尚未选中任何项时选中第一项。
    pub fn has_selected_option_changed(&mut self) -> bool {
        if !self.selection_changed {
            return false;
        }
        self.selection_changed = false;
        if self.selected.is_none() {
            self.selected = Some(0);
        }
        true
    }

    /// 确认当前选中项并继续对话
    ///
    /// 选中项改变后需先经 `has_selected_option_changed` 确认。
    pub fn confirm_select_option(&mut self) {
        if !self.awaiting_options() || self.selection_changed {
            return;
        }
        let Some(index) = self.selected else {
            return;
        };

        self.commands.clear();
        match self.runner.select(index) {
            Ok(()) => {
                debug!(index, "确认选项");
                self.lookahead = self.pull_line();
                self.go_to_next_dialogue_line();
            }
            Err(e) => error!(index, error = %e, "确认选项失败"),
        }
    }
}

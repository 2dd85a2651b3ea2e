//! 分支/标签查询与边沿检测

use super::{DialogueSession, FrameSnapshot, LineType};
use crate::runtime::DialogueRunner;

impl<R: DialogueRunner> DialogueSession<R> {
    /// 当前分支标题
    pub fn get_branch_title(&self) -> &str {
        if !self.running {
            return "";
        }
        self.branch.as_ref().map_or("", |b| b.title.as_str())
    }

    /// 当前分支标题是否为 `title`
    pub fn branch_title_is(&self, title: &str) -> bool {
        self.running && self.get_branch_title() == title
    }

    /// 当前分支的原始正文
    pub fn get_branch_text(&self) -> &str {
        if !self.running {
            return "";
        }
        self.branch.as_ref().map_or("", |b| b.body.as_str())
    }

    fn branch_tags(&self) -> &[String] {
        match (&self.branch, self.running) {
            (Some(branch), true) => branch.tags.as_slice(),
            _ => &[],
        }
    }

    /// 当前分支所有标签，以逗号连接
    pub fn get_branch_tags(&self) -> String {
        self.branch_tags().join(",")
    }

    /// 指定标签；越界时取最后一个
    pub fn get_branch_tag(&self, index: usize) -> &str {
        let tags = self.branch_tags();
        match tags.len() {
            0 => "",
            n => tags[index.min(n - 1)].as_str(),
        }
    }

    /// 当前分支是否有标签 `query`
    ///
    /// 识别三种形式：`query`、`query:值`、`query(参数,...)`。
    /// 匹配到带参数的形式时，参数可通过 `get_tag_parameter` 读取。
    pub fn branch_contains_tag(&mut self, query: &str) -> bool {
        self.tag_parameters.clear();
        let mut found = None;
        for tag in self.branch_tags() {
            if let Some((key, _)) = tag.split_once(':') {
                if key == query {
                    found = Some(Vec::new());
                    break;
                }
            } else if let Some((name, params)) = parse_tag_call(tag) {
                if name == query {
                    found = Some(params.split(',').map(str::to_string).collect());
                    break;
                }
            } else if tag == query {
                found = Some(Vec::new());
                break;
            }
        }

        match found {
            Some(parameters) => {
                self.tag_parameters = parameters;
                true
            }
            None => false,
        }
    }

    /// 上次匹配标签的参数
    pub fn get_tag_parameter(&self, index: usize) -> &str {
        if !self.running {
            return "";
        }
        self.tag_parameters.get(index).map_or("", String::as_str)
    }

    /// `key:value` 形式标签的值
    pub fn get_tag_value_via_key(&self, key: &str) -> &str {
        if key.is_empty() {
            return "";
        }
        self.branch_tags()
            .iter()
            .find(|tag| tag.split_once(':').is_some_and(|(k, _)| k == key))
            .and_then(|tag| tag.split(':').nth(1))
            .unwrap_or("")
    }

    /// 已访问分支标题，以逗号连接
    pub fn get_visited_branch_titles(&self) -> String {
        if !self.running {
            return String::new();
        }
        self.runner.visited().titles().collect::<Vec<_>>().join(",")
    }

    /// 分支是否已访问；`title` 为空时查询当前分支
    pub fn branch_title_has_been_visited(&self, title: &str) -> bool {
        let title = if title.is_empty() {
            self.branch.as_ref().map_or("", |b| b.title.as_str())
        } else {
            title
        };
        !title.is_empty() && self.runner.visited().contains(title)
    }

    /// 说话者是否在本帧改变
    pub fn has_active_actor_changed(&self) -> bool {
        self.running
            && self.line_type == Some(LineType::Text)
            && self.previous.speaker != self.speaker
    }

    /// 分支标题是否在本帧改变
    pub fn branch_title_has_changed(&self) -> bool {
        if !self.running {
            return false;
        }
        let current = self.branch.as_ref().map(|b| b.title.as_str());
        self.previous.branch_title.as_deref() != current
    }

    /// 帧结束：记录边沿检测快照，并应用已完成的资源加载
    pub fn end_frame(&mut self) {
        self.previous = FrameSnapshot {
            speaker: self.speaker.clone(),
            branch_title: self.branch.as_ref().map(|b| b.title.clone()),
        };
        self.poll_resources();
    }
}

/// 解析 `name(a,b)` 形式的标签
fn parse_tag_call(tag: &str) -> Option<(&str, &str)> {
    let open = tag.find('(')?;
    if open == 0 {
        return None;
    }
    let rest = &tag[open + 1..];
    let close = rest.find(')')?;
    if close == 0 {
        return None;
    }
    Some((&tag[..open], &rest[..close]))
}

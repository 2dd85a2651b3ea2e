//! # 阶段 1：行分类
//!
//! 将正文按行切分，记录缩进并识别每行的语法类别。空行与 `//` 注释行被丢弃。

use super::helpers::{split_first_word, strip_command};

/// 行类别（阶段 1 输出）
#[derive(Debug, Clone, PartialEq)]
pub enum LineClass {
    /// `<<if 条件>>`
    If(String),
    /// `<<elseif 条件>>`
    ElseIf(String),
    /// `<<else>>`
    Else,
    /// `<<endif>>`
    EndIf,
    /// `<<set ...>>`（保留 set 之后的内容）
    Set(String),
    /// `<<jump 节点>>`
    Jump(String),
    /// `<<stop>>`
    Stop,
    /// 其他独立命令
    Command(String),
    /// 以 `[[` 开头的链接行
    Links(String),
    /// `-> 文本`（保留箭头之后的内容）
    Shortcut(String),
    /// 普通文本行
    Text(String),
}

/// 分类后的行
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedLine {
    pub class: LineClass,
    pub indent: usize,
    pub line_number: usize,
}

/// 对正文逐行分类
pub fn classify_lines(body: &str) -> Vec<ClassifiedLine> {
    body.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with("//") {
                return None;
            }
            Some(ClassifiedLine {
                class: classify(trimmed),
                indent: super::helpers::indent_width(raw),
                line_number: idx + 1,
            })
        })
        .collect()
}

fn classify(trimmed: &str) -> LineClass {
    if let Some(rest) = trimmed.strip_prefix("->") {
        return LineClass::Shortcut(rest.trim().to_string());
    }
    if trimmed.starts_with("[[") {
        return LineClass::Links(trimmed.to_string());
    }
    let Some(inner) = strip_command(trimmed).filter(|inner| !inner.is_empty()) else {
        return LineClass::Text(trimmed.to_string());
    };

    let (keyword, rest) = split_first_word(inner);
    match keyword {
        "if" => LineClass::If(rest.to_string()),
        "elseif" => LineClass::ElseIf(rest.to_string()),
        "else" if rest.is_empty() => LineClass::Else,
        "else" => match split_first_word(rest) {
            // `<<else if 条件>>` 写法
            ("if", cond) => LineClass::ElseIf(cond.to_string()),
            _ => LineClass::Command(inner.to_string()),
        },
        "endif" => LineClass::EndIf,
        "set" => LineClass::Set(rest.to_string()),
        "jump" => LineClass::Jump(rest.to_string()),
        "stop" if rest.is_empty() => LineClass::Stop,
        _ => LineClass::Command(inner.to_string()),
    }
}

//! # 辅助解析函数
//!
//! 手写的字符串解析辅助函数，无正则依赖。

use crate::error::ParseError;
use crate::script::ast::Segment;

use super::expr_parser::parse_expression;

/// 检查字符串是否以指定前缀开头（大小写不敏感）
pub fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len()
        && s.chars()
            .zip(prefix.chars())
            .all(|(a, b)| a.eq_ignore_ascii_case(&b))
}

/// 计算行首缩进宽度（制表符按 4 个空格计）
pub fn indent_width(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

/// 若整行恰好是一个 `<<...>>` 命令，返回去掉括号后的内容
///
/// 输入: `<<wait 500>>`
/// 输出: `Some("wait 500")`
pub fn strip_command(line: &str) -> Option<&str> {
    let inner = line.trim().strip_prefix("<<")?.strip_suffix(">>")?;
    if inner.contains(">>") || inner.contains("<<") {
        return None;
    }
    Some(inner.trim())
}

/// 拆分出第一个单词及其余部分
///
/// 输入: `set $x to 1`
/// 输出: `("set", "$x to 1")`
pub fn split_first_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(pos) => (&s[..pos], s[pos..].trim_start()),
        None => (s, ""),
    }
}

/// 拆分行尾的 `<<if 条件>>` 守卫
///
/// 输入: `去商店 <<if $gold > 5>>`
/// 输出: `("去商店", Some("$gold > 5"))`
pub fn split_trailing_condition(text: &str) -> (&str, Option<&str>) {
    let trimmed = text.trim_end();
    if trimmed.ends_with(">>")
        && let Some(start) = trimmed.rfind("<<")
        && let Some(inner) = strip_command(&trimmed[start..])
    {
        let (keyword, rest) = split_first_word(inner);
        if keyword == "if" {
            return (trimmed[..start].trim_end(), Some(rest));
        }
    }
    (trimmed, None)
}

/// 将文本拆分为片段：原样文本、`{表达式}` 插值、`<<命令>>`
///
/// `allow_commands` 为 false 时 `<<...>>` 按原样文本保留。
/// 没有闭合的 `{` 按原样文本保留。
pub fn split_segments(
    text: &str,
    line_number: usize,
    allow_commands: bool,
) -> Result<Vec<Segment>, ParseError> {
    let mut segments = Vec::new();
    let mut buffer = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if allow_commands && rest.starts_with("<<") {
            let end = rest[2..].find(">>").ok_or_else(|| ParseError::InvalidLine {
                line: line_number,
                message: "行内命令缺少 '>>'".to_string(),
            })?;
            let command = rest[2..2 + end].trim();
            flush_text(&mut buffer, &mut segments);
            if !command.is_empty() {
                segments.push(Segment::Command(command.to_string()));
            }
            rest = &rest[2 + end + 2..];
            continue;
        }

        if rest.starts_with('{')
            && let Some(end) = rest.find('}')
        {
            let inner = &rest[1..end];
            flush_text(&mut buffer, &mut segments);
            segments.push(Segment::Interpolation(parse_expression(inner, line_number)?));
            rest = &rest[end + 1..];
            continue;
        }

        let Some(c) = rest.chars().next() else {
            break;
        };
        buffer.push(c);
        rest = &rest[c.len_utf8()..];
    }

    flush_text(&mut buffer, &mut segments);
    Ok(segments)
}

fn flush_text(buffer: &mut String, segments: &mut Vec<Segment>) {
    if !buffer.is_empty() {
        segments.push(Segment::Text(std::mem::take(buffer)));
    }
}

/// 解析一行中的链接 `[[文本|节点]]` / `[[节点]]`
///
/// 返回 `(文本, 目标)` 列表；`[[节点]]` 的文本为 `None`。
/// 链接之间只允许空白。
pub fn parse_links(
    line: &str,
    line_number: usize,
) -> Result<Vec<(Option<String>, String)>, ParseError> {
    let mut links = Vec::new();
    let mut rest = line.trim();

    while !rest.is_empty() {
        let inner_start = rest.strip_prefix("[[").ok_or_else(|| ParseError::InvalidLine {
            line: line_number,
            message: format!("链接之间存在多余内容: '{}'", rest),
        })?;
        let end = inner_start.find("]]").ok_or_else(|| ParseError::InvalidLine {
            line: line_number,
            message: "链接缺少 ']]'".to_string(),
        })?;
        let inner = &inner_start[..end];

        let link = match inner.split_once('|') {
            Some((text, target)) => (Some(text.trim().to_string()), target.trim().to_string()),
            None => (None, inner.trim().to_string()),
        };
        if link.1.is_empty() {
            return Err(ParseError::InvalidLine {
                line: line_number,
                message: "链接目标为空".to_string(),
            });
        }
        links.push(link);
        rest = inner_start[end + 2..].trim_start();
    }

    Ok(links)
}

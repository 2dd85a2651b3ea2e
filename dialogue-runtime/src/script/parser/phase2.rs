//! # 阶段 2：结构解析
//!
//! 将分类后的行组装为语句树：条件块按关键字配对，快捷选项体按缩进归属。

use crate::error::ParseError;
use crate::script::ast::{ConditionalBranch, Segment, ShortcutOption, Statement};

use super::expr_parser::parse_expression;
use super::helpers::{parse_links, split_first_word, split_segments, split_trailing_condition};
use super::phase1::{ClassifiedLine, LineClass};

/// 阶段 2 解析器
pub struct Phase2Parser {
    lines: Vec<ClassifiedLine>,
    pos: usize,
    /// 解析警告
    pub warnings: Vec<String>,
}

impl Phase2Parser {
    pub fn new(lines: Vec<ClassifiedLine>) -> Self {
        Self {
            lines,
            pos: 0,
            warnings: Vec::new(),
        }
    }

    /// 解析全部语句
    pub fn parse_all(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.parse_block(None, false)
    }

    fn peek(&self) -> Option<&ClassifiedLine> {
        self.lines.get(self.pos)
    }

    /// 解析一个语句块
    ///
    /// - `parent_indent`: 所属快捷选项的缩进，遇到不深于它的行时结束
    /// - `in_conditional`: 是否位于条件块内，决定 elseif/else/endif 是结束符还是错误
    fn parse_block(
        &mut self,
        parent_indent: Option<usize>,
        in_conditional: bool,
    ) -> Result<Vec<Statement>, ParseError> {
        let mut statements = Vec::new();

        while let Some(line) = self.peek() {
            if parent_indent.is_some_and(|p| line.indent <= p) {
                break;
            }

            let line_number = line.line_number;
            let indent = line.indent;
            match line.class.clone() {
                LineClass::ElseIf(_) | LineClass::Else | LineClass::EndIf => {
                    if in_conditional {
                        break;
                    }
                    return Err(ParseError::UnexpectedKeyword {
                        line: line_number,
                        keyword: keyword_name(&line.class).to_string(),
                    });
                }
                LineClass::If(condition) => {
                    self.pos += 1;
                    statements.push(self.parse_if(&condition, line_number, parent_indent)?);
                }
                LineClass::Shortcut(_) => {
                    statements.push(self.parse_shortcut_group(indent)?);
                }
                LineClass::Set(rest) => {
                    self.pos += 1;
                    statements.push(parse_set(&rest, line_number)?);
                }
                LineClass::Jump(target) => {
                    self.pos += 1;
                    if target.is_empty() {
                        return Err(ParseError::InvalidLine {
                            line: line_number,
                            message: "jump 缺少目标节点".to_string(),
                        });
                    }
                    statements.push(Statement::Jump {
                        target,
                        line: line_number,
                    });
                }
                LineClass::Stop => {
                    self.pos += 1;
                    statements.push(Statement::Stop { line: line_number });
                }
                LineClass::Command(text) => {
                    self.pos += 1;
                    statements.push(Statement::Command {
                        text,
                        line: line_number,
                    });
                }
                LineClass::Links(text) => {
                    self.pos += 1;
                    for (label, target) in parse_links(&text, line_number)? {
                        statements.push(match label {
                            Some(text) => Statement::OptionLink {
                                text,
                                target,
                                line: line_number,
                            },
                            None => Statement::Jump {
                                target,
                                line: line_number,
                            },
                        });
                    }
                }
                LineClass::Text(text) => {
                    self.pos += 1;
                    let segments = split_segments(&text, line_number, true)?;
                    if segments.is_empty() {
                        self.warnings
                            .push(format!("第 {} 行：空命令被忽略", line_number));
                        continue;
                    }
                    statements.push(Statement::Line {
                        segments,
                        line: line_number,
                    });
                }
            }
        }

        Ok(statements)
    }

    /// 解析条件块（`<<if>>` 已被消费）
    fn parse_if(
        &mut self,
        condition: &str,
        line_number: usize,
        parent_indent: Option<usize>,
    ) -> Result<Statement, ParseError> {
        let mut branches = vec![ConditionalBranch {
            condition: Some(parse_condition(condition, line_number)?),
            body: self.parse_block(parent_indent, true)?,
            line: line_number,
        }];
        let mut has_else = false;

        loop {
            let Some(line) = self.peek() else {
                return Err(ParseError::UnclosedBlock {
                    line: line_number,
                    keyword: "if".to_string(),
                });
            };
            let branch_line = line.line_number;
            match line.class.clone() {
                LineClass::EndIf => {
                    self.pos += 1;
                    break;
                }
                LineClass::ElseIf(_) | LineClass::Else if has_else => {
                    return Err(ParseError::UnexpectedKeyword {
                        line: branch_line,
                        keyword: keyword_name(&line.class).to_string(),
                    });
                }
                LineClass::ElseIf(cond) => {
                    self.pos += 1;
                    let condition = parse_condition(&cond, branch_line)?;
                    branches.push(ConditionalBranch {
                        condition: Some(condition),
                        body: self.parse_block(parent_indent, true)?,
                        line: branch_line,
                    });
                }
                LineClass::Else => {
                    self.pos += 1;
                    has_else = true;
                    branches.push(ConditionalBranch {
                        condition: None,
                        body: self.parse_block(parent_indent, true)?,
                        line: branch_line,
                    });
                }
                // 块因缩进回退而结束，缺少 endif
                _ => {
                    return Err(ParseError::UnclosedBlock {
                        line: line_number,
                        keyword: "if".to_string(),
                    });
                }
            }
        }

        Ok(Statement::If {
            branches,
            line: line_number,
        })
    }

    /// 解析同一缩进的连续快捷选项
    fn parse_shortcut_group(&mut self, indent: usize) -> Result<Statement, ParseError> {
        let group_line = self.peek().map_or(0, |l| l.line_number);
        let mut options = Vec::new();

        while let Some(line) = self.peek() {
            let LineClass::Shortcut(text) = &line.class else {
                break;
            };
            if line.indent != indent {
                break;
            }
            let line_number = line.line_number;
            let (label, guard) = split_trailing_condition(text);
            let label = label.to_string();
            let guard = guard.map(str::to_string);
            self.pos += 1;

            let condition = guard
                .map(|g| parse_condition(&g, line_number))
                .transpose()?;
            let text: Vec<Segment> = split_segments(&label, line_number, false)?;
            let body = self.parse_block(Some(indent), false)?;
            options.push(ShortcutOption {
                text,
                condition,
                body,
                line: line_number,
            });
        }

        Ok(Statement::ShortcutOptions {
            options,
            line: group_line,
        })
    }
}

fn parse_condition(condition: &str, line_number: usize) -> Result<crate::script::Expr, ParseError> {
    if condition.trim().is_empty() {
        return Err(ParseError::InvalidExpression {
            line: line_number,
            message: "缺少条件".to_string(),
        });
    }
    parse_expression(condition, line_number)
}

/// 解析 `$var to expr` / `$var = expr`
fn parse_set(rest: &str, line_number: usize) -> Result<Statement, ParseError> {
    let (target, value) = split_first_word(rest);
    let (target, value) = match target.split_once('=') {
        // `$x=1` 没有空格的写法
        Some((name, tail)) => (name, format!("{}{}", tail, value)),
        None => {
            let (op, tail) = split_first_word(value);
            if let Some(after_eq) = op.strip_prefix('=') {
                (target, format!("{} {}", after_eq, tail))
            } else if op.eq_ignore_ascii_case("to") {
                (target, tail.to_string())
            } else {
                return Err(ParseError::InvalidLine {
                    line: line_number,
                    message: format!("set 语句缺少 'to' 或 '='：'{}'", rest),
                });
            }
        }
    };

    let variable = target
        .strip_prefix('$')
        .filter(|name| !name.is_empty())
        .ok_or_else(|| ParseError::InvalidLine {
            line: line_number,
            message: format!("set 语句的目标必须是变量：'{}'", target),
        })?;

    Ok(Statement::Set {
        variable: variable.to_string(),
        value: parse_expression(&value, line_number)?,
        line: line_number,
    })
}

fn keyword_name(class: &LineClass) -> &'static str {
    match class {
        LineClass::ElseIf(_) => "elseif",
        LineClass::Else => "else",
        LineClass::EndIf => "endif",
        _ => "if",
    }
}

//! # 表达式解析器
//!
//! 先切分词法单元，再做递归下降解析。支持变量、字面量、算术、比较、逻辑运算和函数调用。

use crate::error::ParseError;
use crate::script::expr::{BinaryOp, Expr};

/// 解析表达式字符串
///
/// 支持的语法:
/// - 字面量: `"string"`, `'string'`, `1.5`, `true`, `false`
/// - 变量: `$var_name`, `$a.alice.name`
/// - 比较: `==` `is` `eq`, `!=` `neq`, `<` `lt`, `<=` `lte`, `>` `gt`, `>=` `gte`
/// - 逻辑: `and` `&&`, `or` `||`, `not` `!`
/// - 算术: `+ - * / %`，一元 `-`
/// - 函数: `visited("Node")`
/// - 括号: `(expr)`
pub fn parse_expression(input: &str, line_number: usize) -> Result<Expr, ParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(invalid(line_number, "空表达式"));
    }

    let tokens = tokenize(input, line_number)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        line_number,
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(invalid(
            line_number,
            format!("表达式末尾存在无法解析的内容: '{}'", token.describe()),
        ));
    }
    Ok(expr)
}

fn invalid(line: usize, message: impl Into<String>) -> ParseError {
    ParseError::InvalidExpression {
        line,
        message: message.into(),
    }
}

/// 词法单元
#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Var(String),
    Ident(String),
    Symbol(&'static str),
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Var(name) => format!("${}", name),
            Token::Ident(name) => name.clone(),
            Token::Symbol(s) => (*s).to_string(),
        }
    }

    /// 是否为指定关键字（大小写不敏感）
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(name) if name.eq_ignore_ascii_case(keyword))
    }

    fn is_symbol(&self, symbol: &str) -> bool {
        matches!(self, Token::Symbol(s) if *s == symbol)
    }
}

const SYMBOLS: [&str; 17] = [
    "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!", "+", "-", "*", "/", "%", "(", ")", ",",
];

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

fn tokenize(input: &str, line_number: usize) -> Result<Vec<Token>, ParseError> {
    let mut tokens = Vec::new();
    let mut rest = input;

    while let Some(c) = rest.chars().next() {
        if c.is_whitespace() {
            rest = &rest[c.len_utf8()..];
            continue;
        }

        // 字符串字面量
        if c == '"' || c == '\'' {
            let body = &rest[1..];
            let end = body
                .find(c)
                .ok_or_else(|| invalid(line_number, format!("字符串字面量未闭合，缺少 '{}'", c)))?;
            tokens.push(Token::Str(body[..end].to_string()));
            rest = &body[end + 1..];
            continue;
        }

        // 变量
        if c == '$' {
            let body = &rest[1..];
            let len = body
                .find(|ch: char| !is_ident_char(ch))
                .unwrap_or(body.len());
            if len == 0 {
                return Err(invalid(line_number, "'$' 之后期望变量名"));
            }
            tokens.push(Token::Var(body[..len].to_string()));
            rest = &body[len..];
            continue;
        }

        // 数字
        if c.is_ascii_digit() {
            let len = rest
                .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
                .unwrap_or(rest.len());
            let text = &rest[..len];
            let value = text
                .parse::<f64>()
                .map_err(|_| invalid(line_number, format!("无法解析数字: '{}'", text)))?;
            tokens.push(Token::Number(value));
            rest = &rest[len..];
            continue;
        }

        // 标识符（关键字、布尔字面量、函数名）
        if c.is_alphabetic() || c == '_' {
            let len = rest
                .find(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
                .unwrap_or(rest.len());
            tokens.push(Token::Ident(rest[..len].to_string()));
            rest = &rest[len..];
            continue;
        }

        match SYMBOLS.iter().find(|s| rest.starts_with(**s)) {
            Some(symbol) => {
                tokens.push(Token::Symbol(*symbol));
                rest = &rest[symbol.len()..];
            }
            None => {
                return Err(invalid(
                    line_number,
                    format!("无法解析表达式，意外字符: '{}'", c),
                ));
            }
        }
    }

    Ok(tokens)
}

/// 表达式解析器
struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    line_number: usize,
}

impl ExprParser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// 当前词法单元匹配任一关键字/符号时消费它
    fn eat_any(&mut self, keywords: &[&str], symbols: &[&str]) -> bool {
        let matched = self.peek().is_some_and(|t| {
            keywords.iter().any(|k| t.is_keyword(k)) || symbols.iter().any(|s| t.is_symbol(s))
        });
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn expect_symbol(&mut self, symbol: &str, message: &str) -> Result<(), ParseError> {
        if self.peek().is_some_and(|t| t.is_symbol(symbol)) {
            self.pos += 1;
            Ok(())
        } else {
            Err(invalid(self.line_number, message))
        }
    }

    /// 解析 or 表达式（最低优先级）
    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_any(&["or"], &["||"]) {
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    /// 解析 and 表达式
    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_equality()?;
        while self.eat_any(&["and"], &["&&"]) {
            let right = self.parse_equality()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    /// 解析相等比较
    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = if self.eat_any(&["is", "eq"], &["=="]) {
                BinaryOp::Eq
            } else if self.eat_any(&["neq"], &["!="]) {
                BinaryOp::NotEq
            } else {
                break;
            };
            let right = self.parse_comparison()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// 解析大小比较
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_additive()?;
        loop {
            let op = if self.eat_any(&["lte"], &["<="]) {
                BinaryOp::LessEq
            } else if self.eat_any(&["gte"], &[">="]) {
                BinaryOp::GreaterEq
            } else if self.eat_any(&["lt"], &["<"]) {
                BinaryOp::Less
            } else if self.eat_any(&["gt"], &[">"]) {
                BinaryOp::Greater
            } else {
                break;
            };
            let right = self.parse_additive()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = if self.eat_any(&[], &["+"]) {
                BinaryOp::Add
            } else if self.eat_any(&[], &["-"]) {
                BinaryOp::Sub
            } else {
                break;
            };
            let right = self.parse_multiplicative()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            let op = if self.eat_any(&[], &["*"]) {
                BinaryOp::Mul
            } else if self.eat_any(&[], &["/"]) {
                BinaryOp::Div
            } else if self.eat_any(&[], &["%"]) {
                BinaryOp::Rem
            } else {
                break;
            };
            let right = self.parse_unary()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    /// 解析一元运算
    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.eat_any(&["not"], &["!"]) {
            return Ok(Expr::not(self.parse_unary()?));
        }
        if self.eat_any(&[], &["-"]) {
            return Ok(match self.parse_unary()? {
                Expr::Literal(crate::state::VarValue::Number(n)) => Expr::number(-n),
                other => Expr::Neg(Box::new(other)),
            });
        }
        self.parse_primary()
    }

    /// 解析基本表达式
    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let token = self
            .advance()
            .ok_or_else(|| invalid(self.line_number, "表达式意外结束"))?;

        match token {
            Token::Number(n) => Ok(Expr::number(n)),
            Token::Str(s) => Ok(Expr::string(s)),
            Token::Var(name) => Ok(Expr::var(name)),
            Token::Symbol("(") => {
                let expr = self.parse_or()?;
                self.expect_symbol(")", "缺少右括号 ')'")?;
                Ok(expr)
            }
            Token::Ident(name) if name.eq_ignore_ascii_case("true") => Ok(Expr::bool(true)),
            Token::Ident(name) if name.eq_ignore_ascii_case("false") => Ok(Expr::bool(false)),
            Token::Ident(name) if self.peek().is_some_and(|t| t.is_symbol("(")) => {
                self.pos += 1;
                let mut args = Vec::new();
                if self.peek().is_some_and(|t| t.is_symbol(")")) {
                    self.pos += 1;
                } else {
                    loop {
                        args.push(self.parse_or()?);
                        if self.eat_any(&[], &[","]) {
                            continue;
                        }
                        self.expect_symbol(")", "函数调用缺少右括号 ')'")?;
                        break;
                    }
                }
                Ok(Expr::call(name, args))
            }
            other => Err(invalid(
                self.line_number,
                format!("无法解析表达式，意外的 '{}'", other.describe()),
            )),
        }
    }
}

//! # 表达式模块
//!
//! 定义条件、赋值和插值使用的表达式类型和求值器。
//!
//! ## 设计原则
//!
//! - 表达式是**无副作用**的纯函数
//! - 求值是**确定性**的，不依赖 IO 或真实时间
//! - 未定义变量求值为 `false`
//!
//! ## 支持的类型
//!
//! - `Number`: 数字（f64）
//! - `String`: 字符串
//! - `Bool`: 布尔值
//!
//! ## 支持的操作
//!
//! - 比较: `==`/`is`/`eq`, `!=`/`neq`, `<`/`lt`, `<=`/`lte`, `>`/`gt`, `>=`/`gte`
//! - 逻辑: `and`/`&&`, `or`/`||`, `not`/`!`
//! - 算术: `+`, `-`, `*`, `/`, `%`，一元 `-`
//! - 函数: `visited("Node")`

use crate::state::VarValue;

/// 二元运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl BinaryOp {
    /// 运算符的书写形式（用于错误信息）
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::NotEq => "!=",
            Self::Less => "<",
            Self::LessEq => "<=",
            Self::Greater => ">",
            Self::GreaterEq => ">=",
            Self::And => "and",
            Self::Or => "or",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        }
    }
}

/// 表达式 AST 节点
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// 字面量值
    Literal(VarValue),

    /// 变量引用
    ///
    /// 变量名不包含 `$` 前缀
    Variable(String),

    /// 二元运算
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// 逻辑非
    Not(Box<Expr>),

    /// 取负
    Neg(Box<Expr>),

    /// 函数调用
    Call { name: String, args: Vec<Expr> },
}

impl Expr {
    /// 创建字符串字面量
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(VarValue::String(s.into()))
    }

    /// 创建布尔字面量
    pub fn bool(b: bool) -> Self {
        Self::Literal(VarValue::Bool(b))
    }

    /// 创建数字字面量
    pub fn number(n: f64) -> Self {
        Self::Literal(VarValue::Number(n))
    }

    /// 创建变量引用
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    /// 创建二元运算
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 创建相等比较
    pub fn eq(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Eq, left, right)
    }

    /// 创建逻辑与
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    /// 创建逻辑或
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// 创建逻辑非
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: Expr) -> Self {
        Self::Not(Box::new(expr))
    }

    /// 创建函数调用
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }
}

/// 表达式求值错误
#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    /// 类型不匹配
    TypeMismatch {
        expected: &'static str,
        actual: String,
        context: String,
    },

    /// 除数为零
    DivisionByZero,

    /// 未知函数或参数个数不符
    UnknownFunction { name: String, arity: usize },
}

impl std::fmt::Display for EvalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EvalError::TypeMismatch {
                expected,
                actual,
                context,
            } => {
                write!(
                    f,
                    "类型不匹配: 期望 {}，实际 {} ({})",
                    expected, actual, context
                )
            }
            EvalError::DivisionByZero => write!(f, "除数为零"),
            EvalError::UnknownFunction { name, arity } => {
                write!(f, "未知函数 '{}'（{} 个参数）", name, arity)
            }
        }
    }
}

impl std::error::Error for EvalError {}

/// 表达式求值上下文
///
/// 提供变量查找和已访问节点查询能力
pub trait EvalContext {
    /// 获取变量值
    fn get_var(&self, name: &str) -> Option<&VarValue>;

    /// 节点是否已访问
    fn visited(&self, title: &str) -> bool;
}

/// 对表达式求值
pub fn evaluate(expr: &Expr, ctx: &impl EvalContext) -> Result<VarValue, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),

        Expr::Variable(name) => Ok(ctx.get_var(name).cloned().unwrap_or(VarValue::Bool(false))),

        Expr::Not(inner) => {
            let inner_val = evaluate(inner, ctx)?;
            Ok(VarValue::Bool(!to_bool(&inner_val, "not 操作数")?))
        }

        Expr::Neg(inner) => {
            let inner_val = evaluate(inner, ctx)?;
            Ok(VarValue::Number(-to_number(&inner_val, "取负操作数")?))
        }

        Expr::Call { name, args } => match (name.as_str(), args.as_slice()) {
            ("visited", [arg]) => {
                let title = evaluate(arg, ctx)?.to_string();
                Ok(VarValue::Bool(ctx.visited(&title)))
            }
            _ => Err(EvalError::UnknownFunction {
                name: name.clone(),
                arity: args.len(),
            }),
        },

        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let left_bool = to_bool(&evaluate(left, ctx)?, "and 左操作数")?;
                // 短路求值
                if !left_bool {
                    return Ok(VarValue::Bool(false));
                }
                let right_bool = to_bool(&evaluate(right, ctx)?, "and 右操作数")?;
                Ok(VarValue::Bool(right_bool))
            }
            BinaryOp::Or => {
                let left_bool = to_bool(&evaluate(left, ctx)?, "or 左操作数")?;
                // 短路求值
                if left_bool {
                    return Ok(VarValue::Bool(true));
                }
                let right_bool = to_bool(&evaluate(right, ctx)?, "or 右操作数")?;
                Ok(VarValue::Bool(right_bool))
            }
            _ => {
                let left_val = evaluate(left, ctx)?;
                let right_val = evaluate(right, ctx)?;
                apply_binary(*op, &left_val, &right_val)
            }
        },
    }
}

fn apply_binary(op: BinaryOp, left: &VarValue, right: &VarValue) -> Result<VarValue, EvalError> {
    let context = format!("'{}' 操作数", op.symbol());
    match op {
        BinaryOp::Eq => Ok(VarValue::Bool(values_equal(left, right))),
        BinaryOp::NotEq => Ok(VarValue::Bool(!values_equal(left, right))),
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            let ordering = match (left, right) {
                (VarValue::String(a), VarValue::String(b)) => a.partial_cmp(b),
                _ => to_number(left, &context)?.partial_cmp(&to_number(right, &context)?),
            };
            let result = match ordering {
                Some(ord) => match op {
                    BinaryOp::Less => ord.is_lt(),
                    BinaryOp::LessEq => ord.is_le(),
                    BinaryOp::Greater => ord.is_gt(),
                    _ => ord.is_ge(),
                },
                // NaN 参与比较
                None => false,
            };
            Ok(VarValue::Bool(result))
        }
        BinaryOp::Add => match (left, right) {
            (VarValue::Number(a), VarValue::Number(b)) => Ok(VarValue::Number(a + b)),
            (VarValue::String(_), _) | (_, VarValue::String(_)) => {
                Ok(VarValue::String(format!("{}{}", left, right)))
            }
            _ => Err(type_mismatch("Number", left, &context)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let a = to_number(left, &context)?;
            let b = to_number(right, &context)?;
            match op {
                BinaryOp::Sub => Ok(VarValue::Number(a - b)),
                BinaryOp::Mul => Ok(VarValue::Number(a * b)),
                _ if b == 0.0 => Err(EvalError::DivisionByZero),
                BinaryOp::Div => Ok(VarValue::Number(a / b)),
                _ => Ok(VarValue::Number(a % b)),
            }
        }
        BinaryOp::And | BinaryOp::Or => {
            let a = to_bool(left, &context)?;
            let b = to_bool(right, &context)?;
            Ok(VarValue::Bool(if op == BinaryOp::And { a && b } else { a || b }))
        }
    }
}

/// 判断两个值是否相等
///
/// 不同类型的值永远不相等
fn values_equal(left: &VarValue, right: &VarValue) -> bool {
    match (left, right) {
        (VarValue::String(a), VarValue::String(b)) => a == b,
        (VarValue::Bool(a), VarValue::Bool(b)) => a == b,
        (VarValue::Number(a), VarValue::Number(b)) => (a - b).abs() < f64::EPSILON,
        _ => false,
    }
}

fn type_mismatch(expected: &'static str, actual: &VarValue, context: &str) -> EvalError {
    EvalError::TypeMismatch {
        expected,
        actual: actual.type_name().to_string(),
        context: context.to_string(),
    }
}

/// 将值转换为布尔值
fn to_bool(value: &VarValue, context: &str) -> Result<bool, EvalError> {
    value
        .as_bool()
        .ok_or_else(|| type_mismatch("Bool", value, context))
}

/// 将值转换为数字
fn to_number(value: &VarValue, context: &str) -> Result<f64, EvalError> {
    value
        .as_number()
        .ok_or_else(|| type_mismatch("Number", value, context))
}

/// 将表达式求值为布尔值
///
/// 便捷函数，用于条件分支
pub fn evaluate_to_bool(expr: &Expr, ctx: &impl EvalContext) -> Result<bool, EvalError> {
    let value = evaluate(expr, ctx)?;
    to_bool(&value, "条件表达式")
}

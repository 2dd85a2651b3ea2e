//! # Executor 模块
//!
//! 参考解释器 [`YarnRunner`]：把节点正文编译为扁平指令序列并逐条执行。
//!
//! ## 执行模型
//!
//! ```text
//! next_line() -> Option<DialogueLine>
//! ```
//!
//! 1. 若有拆分后尚未交付的行片段，先交付
//! 2. 否则从当前位置执行指令，直到产生一行（文本/命令/选项）或对话结束
//! 3. 交付选项后进入等待选择状态，`select` 之后才能继续

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use crate::error::{LoadError, RuntimeError};
use crate::graph::{DialogueGraph, NodeInfo};
use crate::runtime::line::{DialogueLine, LineKind};
use crate::runtime::runner::DialogueRunner;
use crate::script::{
    EvalContext, EvalError, Expr, Segment, Statement, evaluate, evaluate_to_bool, parse_body,
};
use crate::state::{VarValue, VariableStore, VisitedBranches};

/// 单次 `next_line` 允许执行的最大指令数
const MAX_STEPS: usize = 100_000;

/// 选项目标
#[derive(Debug, Clone, PartialEq)]
pub enum OptionDestination {
    /// 跳转到节点
    Node(String),
    /// 跳转到本节点内的指令位置
    Offset(usize),
}

/// 编译后的指令
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// 交付文本行（行内命令在交付时拆分）
    Line { segments: Vec<Segment>, line: usize },
    /// 交付命令行
    Command { text: String, line: usize },
    /// 变量赋值
    Set {
        variable: String,
        value: Expr,
        line: usize,
    },
    /// 无条件跳转
    Goto(usize),
    /// 条件为假时跳转
    BranchIfFalse {
        condition: Expr,
        target: usize,
        line: usize,
    },
    /// 切换到另一个节点
    RunNode { target: String, line: usize },
    /// 结束对话
    Stop,
    /// 收集一个选项
    AddOption {
        text: Vec<Segment>,
        destination: OptionDestination,
        condition: Option<Expr>,
        line: usize,
    },
    /// 展示已收集的选项；没有可用选项时跳到 `skip`
    ShowOptions { line: usize, skip: usize },
}

/// 将语句树编译为指令序列
pub fn compile(statements: &[Statement]) -> Vec<Instruction> {
    let mut out = Vec::new();
    compile_block(statements, &mut out);
    out
}

fn compile_block(statements: &[Statement], out: &mut Vec<Instruction>) {
    for statement in statements {
        match statement {
            Statement::Line { segments, line } => out.push(Instruction::Line {
                segments: segments.clone(),
                line: *line,
            }),
            Statement::Command { text, line } => out.push(Instruction::Command {
                text: text.clone(),
                line: *line,
            }),
            Statement::Set {
                variable,
                value,
                line,
            } => out.push(Instruction::Set {
                variable: variable.clone(),
                value: value.clone(),
                line: *line,
            }),
            Statement::Jump { target, line } => out.push(Instruction::RunNode {
                target: target.clone(),
                line: *line,
            }),
            Statement::Stop { .. } => out.push(Instruction::Stop),
            Statement::OptionLink { text, target, line } => out.push(Instruction::AddOption {
                text: vec![Segment::Text(text.clone())],
                destination: OptionDestination::Node(target.clone()),
                condition: None,
                line: *line,
            }),
            Statement::If { branches, .. } => {
                let mut end_jumps = Vec::new();
                for branch in branches {
                    let skip = branch.condition.as_ref().map(|condition| {
                        out.push(Instruction::BranchIfFalse {
                            condition: condition.clone(),
                            target: 0,
                            line: branch.line,
                        });
                        out.len() - 1
                    });
                    compile_block(&branch.body, out);
                    end_jumps.push(out.len());
                    out.push(Instruction::Goto(0));
                    if let Some(index) = skip {
                        let next_branch = out.len();
                        patch_target(out, index, next_branch);
                    }
                }
                let end = out.len();
                for index in end_jumps {
                    patch_target(out, index, end);
                }
            }
            Statement::ShortcutOptions { options, line } => {
                let first_option = out.len();
                for option in options {
                    out.push(Instruction::AddOption {
                        text: option.text.clone(),
                        destination: OptionDestination::Offset(0),
                        condition: option.condition.clone(),
                        line: option.line,
                    });
                }
                let show = out.len();
                out.push(Instruction::ShowOptions {
                    line: *line,
                    skip: 0,
                });

                let mut end_jumps = Vec::new();
                for (i, option) in options.iter().enumerate() {
                    let body_start = out.len();
                    patch_target(out, first_option + i, body_start);
                    compile_block(&option.body, out);
                    end_jumps.push(out.len());
                    out.push(Instruction::Goto(0));
                }
                let end = out.len();
                patch_target(out, show, end);
                for index in end_jumps {
                    patch_target(out, index, end);
                }
            }
        }
    }
}

fn patch_target(out: &mut [Instruction], index: usize, value: usize) {
    match &mut out[index] {
        Instruction::Goto(target)
        | Instruction::BranchIfFalse { target, .. }
        | Instruction::ShowOptions { skip: target, .. } => *target = value,
        Instruction::AddOption {
            destination: OptionDestination::Offset(target),
            ..
        } => *target = value,
        _ => {}
    }
}

/// 编译后的节点
#[derive(Debug, Clone)]
struct CompiledNode {
    info: Arc<NodeInfo>,
    instructions: Vec<Instruction>,
}

/// 执行位置
#[derive(Debug, Clone, PartialEq)]
struct Cursor {
    node: String,
    pc: usize,
}

/// 已收集的选项
#[derive(Debug, Clone)]
struct PendingOption {
    text: String,
    destination: OptionDestination,
    line: usize,
}

/// 求值作用域
struct Scope<'a> {
    variables: &'a VariableStore,
    visited: &'a VisitedBranches,
}

impl EvalContext for Scope<'_> {
    fn get_var(&self, name: &str) -> Option<&VarValue> {
        self.variables.get(name)
    }

    fn visited(&self, title: &str) -> bool {
        self.visited.contains(title)
    }
}

/// Yarn 参考解释器
#[derive(Debug, Default)]
pub struct YarnRunner {
    nodes: HashMap<String, CompiledNode>,
    order: Vec<String>,
    variables: VariableStore,
    visited: VisitedBranches,
    cursor: Option<Cursor>,
    pending_options: Vec<PendingOption>,
    awaiting: Option<Vec<PendingOption>>,
    queued: VecDeque<DialogueLine>,
}

impl YarnRunner {
    /// 创建空解释器
    pub fn new() -> Self {
        Self::default()
    }

    /// 从对话图创建解释器
    pub fn from_graph(graph: &DialogueGraph) -> Result<Self, LoadError> {
        let mut runner = Self::new();
        runner.load(graph)?;
        Ok(runner)
    }

    /// 是否正在等待选择
    pub fn is_awaiting_selection(&self) -> bool {
        self.awaiting.is_some()
    }

    /// 当前执行的节点
    pub fn current_node(&self) -> Option<&str> {
        self.cursor.as_ref().map(|c| c.node.as_str())
    }

    /// 清除执行位置
    fn halt(&mut self) {
        self.cursor = None;
        self.awaiting = None;
        self.pending_options.clear();
        self.queued.clear();
    }

    fn enter_node(&mut self, title: &str) -> Result<(), RuntimeError> {
        if !self.nodes.contains_key(title) {
            self.halt();
            return Err(RuntimeError::NodeNotFound {
                title: title.to_string(),
            });
        }
        debug!(branch = %title, "进入节点");
        self.visited.mark(title);
        self.cursor = Some(Cursor {
            node: title.to_string(),
            pc: 0,
        });
        self.pending_options.clear();
        Ok(())
    }

    fn set_pc(&mut self, pc: usize) {
        if let Some(cursor) = self.cursor.as_mut() {
            cursor.pc = pc;
        }
    }

    fn scope(&self) -> Scope<'_> {
        Scope {
            variables: &self.variables,
            visited: &self.visited,
        }
    }

    fn eval_error(&mut self, node: &str, line: usize, source: EvalError) -> RuntimeError {
        self.halt();
        RuntimeError::Eval {
            node: node.to_string(),
            line,
            source,
        }
    }

    fn eval(&mut self, expr: &Expr, node: &str, line: usize) -> Result<VarValue, RuntimeError> {
        match evaluate(expr, &self.scope()) {
            Ok(value) => Ok(value),
            Err(e) => Err(self.eval_error(node, line, e)),
        }
    }

    fn eval_bool(&mut self, expr: &Expr, node: &str, line: usize) -> Result<bool, RuntimeError> {
        match evaluate_to_bool(expr, &self.scope()) {
            Ok(value) => Ok(value),
            Err(e) => Err(self.eval_error(node, line, e)),
        }
    }

    /// 渲染文本片段（不拆分命令）
    fn render(
        &mut self,
        segments: &[Segment],
        node: &str,
        line: usize,
    ) -> Result<String, RuntimeError> {
        let mut text = String::new();
        for segment in segments {
            match segment {
                Segment::Text(t) => text.push_str(t),
                Segment::Interpolation(expr) => {
                    let value = self.eval(expr, node, line)?;
                    text.push_str(&value.to_string());
                }
                Segment::Command(c) => {
                    text.push_str("<<");
                    text.push_str(c);
                    text.push_str(">>");
                }
            }
        }
        Ok(text)
    }

    /// 将文本行拆分为文本/命令片段，放入待交付队列
    fn queue_line(
        &mut self,
        segments: &[Segment],
        info: &Arc<NodeInfo>,
        line: usize,
    ) -> Result<(), RuntimeError> {
        let mut text = String::new();
        for segment in segments {
            match segment {
                Segment::Command(command) => {
                    self.flush_text(&mut text, info, line);
                    self.queued.push_back(DialogueLine::new(
                        LineKind::Command(command.clone()),
                        Arc::clone(info),
                        line,
                    ));
                }
                other => {
                    let piece = self.render(std::slice::from_ref(other), &info.title, line)?;
                    text.push_str(&piece);
                }
            }
        }
        self.flush_text(&mut text, info, line);
        Ok(())
    }

    fn flush_text(&mut self, text: &mut String, info: &Arc<NodeInfo>, line: usize) {
        let piece = text.trim();
        if !piece.is_empty() {
            self.queued.push_back(DialogueLine::new(
                LineKind::Text(piece.to_string()),
                Arc::clone(info),
                line,
            ));
        }
        text.clear();
    }

    /// 展示已收集的选项，进入等待选择状态
    fn show_options(&mut self, info: Arc<NodeInfo>, line: usize) -> DialogueLine {
        let options = std::mem::take(&mut self.pending_options);
        let texts = options.iter().map(|o| o.text.clone()).collect();
        self.awaiting = Some(options);
        DialogueLine::new(LineKind::Options(texts), info, line)
    }
}

impl DialogueRunner for YarnRunner {
    fn load(&mut self, graph: &DialogueGraph) -> Result<(), LoadError> {
        let mut nodes = HashMap::with_capacity(graph.len());
        let mut order = Vec::with_capacity(graph.len());

        for node in graph.nodes() {
            let body = parse_body(&node.body).map_err(|source| LoadError::Body {
                title: node.title.clone(),
                source,
            })?;
            order.push(node.title.clone());
            nodes.insert(
                node.title.clone(),
                CompiledNode {
                    info: Arc::new(node.clone()),
                    instructions: compile(&body.statements),
                },
            );
        }

        debug!(nodes = nodes.len(), "对话图编译完成");
        self.nodes = nodes;
        self.order = order;
        self.halt();
        Ok(())
    }

    fn has_node(&self, title: &str) -> bool {
        self.nodes.contains_key(title)
    }

    fn node_titles(&self) -> Vec<String> {
        self.order.clone()
    }

    fn run(&mut self, start: &str) -> Result<(), RuntimeError> {
        self.halt();
        self.enter_node(start)
    }

    fn next_line(&mut self) -> Result<Option<DialogueLine>, RuntimeError> {
        if self.awaiting.is_some() {
            return Err(RuntimeError::AwaitingSelection);
        }
        if let Some(line) = self.queued.pop_front() {
            return Ok(Some(line));
        }

        for _ in 0..MAX_STEPS {
            let Some(cursor) = self.cursor.clone() else {
                return Ok(None);
            };
            let Some(node) = self.nodes.get(&cursor.node) else {
                self.halt();
                return Err(RuntimeError::NodeNotFound { title: cursor.node });
            };
            let info = Arc::clone(&node.info);
            let Some(instruction) = node.instructions.get(cursor.pc).cloned() else {
                // 节点末尾：有收集到的选项则展示，否则对话结束
                if self.pending_options.is_empty() {
                    self.halt();
                    return Ok(None);
                }
                let line = self.pending_options.last().map_or(0, |o| o.line);
                return Ok(Some(self.show_options(info, line)));
            };

            let title = cursor.node.as_str();
            self.set_pc(cursor.pc + 1);
            match instruction {
                Instruction::Line { segments, line } => {
                    self.queue_line(&segments, &info, line)?;
                    if let Some(piece) = self.queued.pop_front() {
                        return Ok(Some(piece));
                    }
                }
                Instruction::Command { text, line } => {
                    return Ok(Some(DialogueLine::new(LineKind::Command(text), info, line)));
                }
                Instruction::Set {
                    variable,
                    value,
                    line,
                } => {
                    let value = self.eval(&value, title, line)?;
                    debug!(variable = %variable, value = %value, "设置变量");
                    self.variables.set(variable, value);
                }
                Instruction::Goto(target) => self.set_pc(target),
                Instruction::BranchIfFalse {
                    condition,
                    target,
                    line,
                } => {
                    if !self.eval_bool(&condition, title, line)? {
                        self.set_pc(target);
                    }
                }
                Instruction::RunNode { target, .. } => self.enter_node(&target)?,
                Instruction::Stop => {
                    self.halt();
                    return Ok(None);
                }
                Instruction::AddOption {
                    text,
                    destination,
                    condition,
                    line,
                } => {
                    let available = match &condition {
                        Some(condition) => self.eval_bool(condition, title, line)?,
                        None => true,
                    };
                    if available {
                        let text = self.render(&text, title, line)?;
                        self.pending_options.push(PendingOption {
                            text,
                            destination,
                            line,
                        });
                    }
                }
                Instruction::ShowOptions { line, skip } => {
                    if self.pending_options.is_empty() {
                        self.set_pc(skip);
                    } else {
                        return Ok(Some(self.show_options(info, line)));
                    }
                }
            }
        }

        let node = self.current_node().unwrap_or_default().to_string();
        self.halt();
        Err(RuntimeError::StepLimitExceeded {
            node,
            steps: MAX_STEPS,
        })
    }

    fn select(&mut self, index: usize) -> Result<(), RuntimeError> {
        let mut options = self
            .awaiting
            .take()
            .ok_or(RuntimeError::NotAwaitingSelection)?;
        if index >= options.len() {
            let max = options.len();
            self.awaiting = Some(options);
            return Err(RuntimeError::InvalidChoiceIndex { index, max });
        }

        let option = options.swap_remove(index);
        debug!(index, text = %option.text, "选择选项");
        match option.destination {
            OptionDestination::Node(target) => self.enter_node(&target),
            OptionDestination::Offset(pc) => {
                self.set_pc(pc);
                Ok(())
            }
        }
    }

    fn variables(&self) -> &VariableStore {
        &self.variables
    }

    fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    fn visited(&self) -> &VisitedBranches {
        &self.visited
    }

    fn visited_mut(&mut self) -> &mut VisitedBranches {
        &mut self.visited
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_for(json: &str) -> YarnRunner {
        YarnRunner::from_graph(&DialogueGraph::parse(json).unwrap()).unwrap()
    }

    fn single(body: &str) -> YarnRunner {
        let graph = DialogueGraph::from_nodes([NodeInfo::new("Start", vec![], body)]).unwrap();
        let mut runner = YarnRunner::from_graph(&graph).unwrap();
        runner.run("Start").unwrap();
        runner
    }

    fn kinds(runner: &mut YarnRunner) -> Vec<LineKind> {
        let mut out = Vec::new();
        while let Some(line) = runner.next_line().unwrap() {
            let is_options = matches!(line.kind, LineKind::Options(_));
            out.push(line.kind);
            if is_options {
                break;
            }
        }
        out
    }

    fn t(s: &str) -> LineKind {
        LineKind::Text(s.to_string())
    }

    #[test]
    fn test_text_lines_and_end() {
        let mut runner = single("One\nTwo");
        assert_eq!(kinds(&mut runner), vec![t("One"), t("Two")]);
        assert_eq!(runner.next_line().unwrap(), None);
        assert!(runner.visited().contains("Start"));
    }

    #[test]
    fn test_inline_command_split_shares_line_number() {
        let mut runner = single("Hello <<wait 500>> world\nNext");
        let first = runner.next_line().unwrap().unwrap();
        let second = runner.next_line().unwrap().unwrap();
        let third = runner.next_line().unwrap().unwrap();
        let fourth = runner.next_line().unwrap().unwrap();
        assert_eq!(first.kind, t("Hello"));
        assert_eq!(second.kind, LineKind::Command("wait 500".to_string()));
        assert_eq!(third.kind, t("world"));
        assert_eq!(
            (first.line_num, second.line_num, third.line_num),
            (1, 1, 1)
        );
        assert_eq!(fourth.line_num, 2);
    }

    #[test]
    fn test_set_and_interpolation() {
        let mut runner = single("<<set $gold to 2 + 3>>\nYou have {$gold} gold.");
        assert_eq!(kinds(&mut runner), vec![t("You have 5 gold.")]);
        assert_eq!(
            runner.variables().get("gold"),
            Some(&VarValue::Number(5.0))
        );
    }

    #[test]
    fn test_if_branches() {
        let body = "<<set $gold to 3>>\n<<if $gold > 10>>\nRich\n<<elseif $gold > 0>>\nPoor\n<<else>>\nBroke\n<<endif>>\nEnd";
        let mut runner = single(body);
        assert_eq!(kinds(&mut runner), vec![t("Poor"), t("End")]);
    }

    #[test]
    fn test_link_options_shown_at_node_end() {
        let mut runner = runner_for(
            r#"[
                {"title": "Start", "body": "Where?\n[[North|N]]\n[[South|S]]"},
                {"title": "N", "body": "Cold"},
                {"title": "S", "body": "Warm"}
            ]"#,
        );
        runner.run("Start").unwrap();
        assert_eq!(
            kinds(&mut runner),
            vec![
                t("Where?"),
                LineKind::Options(vec!["North".to_string(), "South".to_string()])
            ]
        );
        assert_eq!(runner.next_line(), Err(RuntimeError::AwaitingSelection));
        assert_eq!(
            runner.select(5),
            Err(RuntimeError::InvalidChoiceIndex { index: 5, max: 2 })
        );
        runner.select(1).unwrap();
        let line = runner.next_line().unwrap().unwrap();
        assert_eq!(line.kind, t("Warm"));
        assert_eq!(line.title(), "S");
        assert!(runner.visited().contains("S"));
        assert!(!runner.visited().contains("N"));
    }

    #[test]
    fn test_select_without_prompt() {
        let mut runner = single("Hi");
        assert_eq!(runner.select(0), Err(RuntimeError::NotAwaitingSelection));
    }

    #[test]
    fn test_shortcut_options_with_guard() {
        let body = "Pick\n-> Red\n    Fire\n-> Blue <<if $cold>>\n    Ice\n-> Green\n    Leaf\nAfter";
        let mut runner = single(body);
        assert_eq!(
            kinds(&mut runner),
            vec![
                t("Pick"),
                LineKind::Options(vec!["Red".to_string(), "Green".to_string()])
            ]
        );
        runner.select(1).unwrap();
        assert_eq!(kinds(&mut runner), vec![t("Leaf"), t("After")]);
    }

    #[test]
    fn test_shortcut_options_all_guarded_out() {
        let body = "Pick\n-> Red <<if $no>>\n    Fire\n-> Blue <<if $no>>\n    Ice\nAfter";
        let mut runner = single(body);
        // 没有可用选项时跳过整组选项体
        assert_eq!(kinds(&mut runner), vec![t("Pick"), t("After")]);
    }

    #[test]
    fn test_jump_and_stop() {
        let mut runner = runner_for(
            r#"[
                {"title": "Start", "body": "A\n<<jump Next>>\nNever"},
                {"title": "Next", "body": "B\n<<stop>>\nNever"}
            ]"#,
        );
        runner.run("Start").unwrap();
        assert_eq!(kinds(&mut runner), vec![t("A"), t("B")]);
        assert_eq!(runner.next_line().unwrap(), None);
    }

    #[test]
    fn test_visited_function_in_conditions() {
        let mut runner = runner_for(
            r#"[
                {"title": "Start", "body": "<<if visited(\"Start\")>>\nAgain\n<<endif>>\n[[Start]]"}
            ]"#,
        );
        runner.run("Start").unwrap();
        assert_eq!(runner.next_line().unwrap().unwrap().kind, t("Again"));
    }

    #[test]
    fn test_missing_node_errors() {
        let mut runner = runner_for(r#"[{"title": "Start", "body": "<<jump Nowhere>>"}]"#);
        assert_eq!(
            runner.run("Missing"),
            Err(RuntimeError::NodeNotFound {
                title: "Missing".to_string()
            })
        );
        runner.run("Start").unwrap();
        assert!(matches!(
            runner.next_line(),
            Err(RuntimeError::NodeNotFound { .. })
        ));
        assert_eq!(runner.next_line().unwrap(), None);
    }

    #[test]
    fn test_eval_error_halts() {
        let mut runner = single("<<set $x to 1 / 0>>\nNever");
        assert!(matches!(
            runner.next_line(),
            Err(RuntimeError::Eval { line: 1, .. })
        ));
        assert_eq!(runner.next_line().unwrap(), None);
    }

    #[test]
    fn test_jump_cycle_hits_step_limit() {
        let mut runner = runner_for(r#"[{"title": "Start", "body": "[[Start]]"}]"#);
        runner.run("Start").unwrap();
        assert!(matches!(
            runner.next_line(),
            Err(RuntimeError::StepLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_load_failure_keeps_previous_program() {
        let mut runner = runner_for(r#"[{"title": "Start", "body": "Hi"}]"#);
        runner.variables_mut().set("kept", true);
        let bad = DialogueGraph::parse(r#"[{"title": "Bad", "body": "<<if>>"}]"#).unwrap();
        assert!(matches!(runner.load(&bad), Err(LoadError::Body { .. })));
        assert!(runner.has_node("Start"));
        assert_eq!(runner.node_titles(), vec!["Start".to_string()]);
        assert!(runner.variables().contains("kept"));
    }

    #[test]
    fn test_compile_if_layout() {
        let body = parse_body("<<if $a>>\nA\n<<else>>\nB\n<<endif>>").unwrap();
        let instructions = compile(&body.statements);
        assert!(matches!(
            instructions[0],
            Instruction::BranchIfFalse { target: 3, .. }
        ));
        assert_eq!(instructions[2], Instruction::Goto(5));
        assert_eq!(instructions[4], Instruction::Goto(5));
        assert_eq!(instructions.len(), 5);
    }
}

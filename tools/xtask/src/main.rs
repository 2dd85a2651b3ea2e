//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 dialogue-runtime 覆盖率
//! - `cov-workspace`: 运行 workspace 覆盖率
//! - `dialogue-check`: 检查对话文件（解析、跳转目标、重复标题）

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use dialogue_runtime::{DiagnosticResult, DialogueGraph, analyze_graph};
use walkdir::WalkDir;

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn ensure_cargo_llvm_cov_available() -> anyhow::Result<()> {
    let mut cmd = Command::new("cargo");
    cmd.args(["llvm-cov", "--version"]);
    match cmd.status() {
        Ok(s) if s.success() => Ok(()),
        _ => anyhow::bail!(
            "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
        ),
    }
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;
        }
        "cov-runtime" => {
            ensure_cargo_llvm_cov_available()?;

            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "-p", "dialogue-runtime", "--html"]);
            run("cargo llvm-cov -p dialogue-runtime --html", &mut cov)?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "cov-workspace" => {
            ensure_cargo_llvm_cov_available()?;

            // 排除 xtask，只统计运行时与播放器
            let mut cov = Command::new("cargo");
            cov.args(["llvm-cov", "--workspace", "--exclude", "xtask", "--html"]);
            run(
                "cargo llvm-cov --workspace --exclude xtask --html",
                &mut cov,
            )?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "dialogue-check" => {
            let path = args.next();
            dialogue_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 dialogue-runtime 覆盖率报告
  cov-workspace   运行 workspace 覆盖率报告
  dialogue-check  检查对话文件

DIALOGUE-CHECK:
  cargo xtask dialogue-check [path]

  不带参数：检查 dialogues/ 下所有 .json 与 .yarn 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - 节点正文语法错误
    - 未定义的跳转目标（jump/选项引用的节点）
    - 重复的节点标题

ALIASES (in .cargo/config.toml):
  cargo check-all      -> cargo xtask check-all
  cargo cov-runtime    -> cargo xtask cov-runtime
  cargo cov-workspace  -> cargo xtask cov-workspace
  cargo dialogue-check -> cargo xtask dialogue-check
"#
    );
}

//=============================================================================
// dialogue-check 命令实现
//=============================================================================

/// 默认对话目录（相对于 workspace root）
const DEFAULT_DIALOGUE_DIR: &str = "dialogues";

/// 对话检查结果
#[derive(Default)]
struct DialogueCheckResult {
    /// 检查的文件数量
    files_checked: usize,
    /// 无法读取或解析的文件数量
    load_errors: usize,
    /// 诊断结果
    diagnostics: DiagnosticResult,
}

/// 执行对话检查
fn dialogue_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_dialogue_files(&path)
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(DEFAULT_DIALOGUE_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认对话目录不存在: {}\n请在 workspace 根目录运行，或指定对话路径",
                    dir.display()
                );
            }
            collect_dialogue_files(dir)
        }
    };

    if files.is_empty() {
        eprintln!("未找到对话文件（.json/.yarn）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个对话文件...\n", files.len());

    let mut result = DialogueCheckResult::default();
    for file in &files {
        check_dialogue_file(file, &mut result);
    }

    print_check_result(&result);

    if result.load_errors > 0 || result.diagnostics.has_errors() {
        anyhow::bail!("对话检查发现错误");
    }

    Ok(())
}

fn is_dialogue_file(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "json" || ext == "yarn")
}

/// 收集目录下的所有对话文件
fn collect_dialogue_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| is_dialogue_file(p))
        .collect();
    files.sort();
    files
}

/// 检查单个对话文件
fn check_dialogue_file(file: &Path, result: &mut DialogueCheckResult) {
    let file_id = file.display().to_string();
    result.files_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", file_id, e);
            result.load_errors += 1;
            return;
        }
    };

    let graph = match DialogueGraph::parse(&content) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", file_id, e);
            result.load_errors += 1;
            return;
        }
    };

    let mut diag = analyze_graph(&graph);
    // 节点标题只在单个文件内唯一，带上文件名便于定位
    for d in &mut diag.diagnostics {
        d.node = format!("{}#{}", file_id, d.node);
    }
    result.diagnostics.merge(diag);
}

/// 输出检查结果
fn print_check_result(result: &DialogueCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {} 个对话文件", result.files_checked);
    eprintln!();

    for diag in &result.diagnostics.diagnostics {
        eprintln!("{}", diag);
    }

    let error_count = result.load_errors + result.diagnostics.error_count();
    let warn_count = result.diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}

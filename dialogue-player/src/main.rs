//! # Dialogue Player
//!
//! 终端对话播放器：逐帧驱动 `DialogueSession`。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p dialogue-player -- play dialogues/intro.json
//! cargo run -p dialogue-player -- play intro.json --start Intro --interval 10
//! cargo run -p dialogue-player -- play intro.json --save saves/intro.json
//! cargo run -p dialogue-player -- inspect dialogues/intro.json
//! ```

mod config;
mod player;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dialogue_runtime::{
    DialogueGraph, DialogueSave, DialogueSession, FsJsonResources, analyze_graph,
};
use tracing::{info, warn};

use config::PlayerConfig;
use player::PlayOptions;

#[derive(Parser)]
#[command(name = "dialogue-player")]
#[command(about = "终端对话播放器")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 播放对话
    Play {
        /// 对话文件（JSON）
        file: PathBuf,

        /// 起始节点
        #[arg(short, long)]
        start: Option<String>,

        /// 配置文件（默认：player.json）
        #[arg(short, long, default_value = "player.json")]
        config: PathBuf,

        /// 逐字显示间隔（毫秒）
        #[arg(short, long)]
        interval: Option<u64>,

        /// 存档文件
        #[arg(long)]
        save: Option<PathBuf>,

        /// 输出调试日志
        #[arg(short, long)]
        verbose: bool,
    },

    /// 列出对话文件中的节点
    Inspect {
        /// 对话文件（JSON 或 Yarn 文本）
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("dialogue-player error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Play {
            file,
            start,
            config,
            interval,
            save,
            verbose,
        } => {
            let mut config = PlayerConfig::load(&config)?;
            // 命令行参数优先
            if let Some(start) = start {
                config.start_node = start;
            }
            if let Some(interval) = interval {
                config.scroll_interval_ms = interval;
            }
            if save.is_some() {
                config.save_path = save;
            }
            if verbose {
                config.log_level = "debug".to_string();
            }
            config.validate()?;
            init_tracing(&config)?;

            play(&config, &file)
        }
        Commands::Inspect { file } => inspect(&file),
    }
}

fn init_tracing(config: &PlayerConfig) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config.tracing_level()?)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn play(config: &PlayerConfig, file: &Path) -> anyhow::Result<()> {
    let path = config.resolve_dialogue_path(file);
    let root = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("无效的对话文件路径: {}", path.display()))?;

    let mut session = DialogueSession::new();

    if let Some(save_path) = &config.save_path {
        restore_save(&mut session, save_path);
    }
    for actor in &config.actors {
        session.create_new_actor(&actor.id, &actor.name, &actor.color);
    }

    let mut resources = FsJsonResources::new(root);
    session.load_from_json_file(&mut resources, name, &config.start_node);
    if !session.is_running() {
        anyhow::bail!(
            "无法从节点 '{}' 开始对话: {}",
            config.start_node,
            path.display()
        );
    }
    info!(file = %path.display(), start = %config.start_node, "开始播放");

    let options = PlayOptions {
        interval: Duration::from_millis(config.scroll_interval_ms),
        option_cursor: config.option_cursor.clone(),
    };
    let stdin = io::stdin();
    let stdout = io::stdout();
    player::run(&mut session, &options, &mut stdin.lock(), &mut stdout.lock())?;

    if let Some(save_path) = &config.save_path {
        let json = session.save_state().to_json()?;
        if let Some(dir) = save_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(save_path, json)
            .with_context(|| format!("写入存档失败: {}", save_path.display()))?;
        info!(path = %save_path.display(), "存档已写入");
    }

    Ok(())
}

fn restore_save(session: &mut DialogueSession, path: &Path) {
    if !path.exists() {
        return;
    }
    let loaded = std::fs::read_to_string(path)
        .map_err(|e| e.to_string())
        .and_then(|text| DialogueSave::from_json(&text).map_err(|e| e.to_string()));
    match loaded {
        Ok(save) => session.load_state_from(save),
        Err(e) => warn!(path = %path.display(), error = %e, "存档无法读取，忽略"),
    }
}

fn inspect(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("无法读取文件: {}", file.display()))?;
    let graph = DialogueGraph::parse(&text)?;

    println!("{} 个节点", graph.len());
    for node in graph.nodes() {
        let lines = node.body.lines().filter(|l| !l.trim().is_empty()).count();
        if node.tags.is_empty() {
            println!("  {} ({} 行)", node.title, lines);
        } else {
            println!("  {} [{}] ({} 行)", node.title, node.tags.join(", "), lines);
        }
    }

    let result = analyze_graph(&graph);
    for diag in &result.diagnostics {
        println!("{}", diag);
    }
    Ok(())
}

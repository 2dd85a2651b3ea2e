//! # Player 模块
//!
//! 终端帧循环：逐字显示、命令回显、wait 计时、回车推进、数字选择选项。

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use dialogue_runtime::{DialogueRunner, DialogueSession, LineType, WaitClock};
use tracing::debug;

/// 帧循环参数
#[derive(Debug, Clone)]
pub struct PlayOptions {
    /// 逐字显示间隔
    pub interval: Duration,
    /// 选项光标
    pub option_cursor: String,
}

/// 播放直到对话结束
///
/// 输入结束（EOF）时停止对话。
pub fn run<R, I, W>(
    session: &mut DialogueSession<R>,
    options: &PlayOptions,
    input: &mut I,
    out: &mut W,
) -> anyhow::Result<()>
where
    R: DialogueRunner,
    I: BufRead,
    W: Write,
{
    let mut clock = WaitClock::new();
    let mut shown = String::new();
    let mut last_frame = Instant::now();

    while session.is_running() {
        let now = Instant::now();
        session.pump_waits(&mut clock, now - last_frame);
        last_frame = now;

        echo_commands(session, out)?;

        if session.is_dialogue_line_type(LineType::Options) {
            if !shown.is_empty() {
                writeln!(out)?;
                shown.clear();
            }
            if !choose_option(session, options, input, out)? {
                session.stop_running_dialogue();
            }
            session.end_frame();
            continue;
        }

        if session.is_paused() {
            session.end_frame();
            pause(options.interval);
            continue;
        }

        let was_complete = session.has_clipped_scrolling_completed();
        let before_text = session.get_text().to_string();
        session.scroll_clipped_text();
        render_text(session, &mut shown, out)?;

        // 已显示完毕且没有自动推进到续行：等待玩家
        let stalled = was_complete && session.get_text() == before_text;
        if stalled && session.has_clipped_scrolling_completed() && !session.is_paused() {
            // 最后一行显示完毕后对话在下一次 is_running 时结束
            if !session.is_running() {
                break;
            }
            if !wait_for_enter(input)? {
                session.stop_running_dialogue();
                break;
            }
            writeln!(out)?;
            shown.clear();
            session.go_to_next_dialogue_line();
        }

        session.end_frame();
        pause(options.interval);
    }

    if !shown.is_empty() {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

fn pause(interval: Duration) {
    if !interval.is_zero() {
        std::thread::sleep(interval);
    }
}

/// 回显已触发的命令（wait 由计时器处理）
fn echo_commands<R: DialogueRunner, W: Write>(
    session: &mut DialogueSession<R>,
    out: &mut W,
) -> anyhow::Result<()> {
    let triggered: Vec<_> = session
        .peek_triggered_commands()
        .iter()
        .map(|c| (c.id(), c.name() == "wait", c.parameters().join(" ")))
        .collect();

    for (id, is_wait, text) in triggered {
        session.consume_command(id);
        if !is_wait {
            write!(out, "<<{}>>", text)?;
            out.flush()?;
        }
    }
    Ok(())
}

/// 输出新显示出的字符；新的一行先输出说话者
fn render_text<R: DialogueRunner, W: Write>(
    session: &DialogueSession<R>,
    shown: &mut String,
    out: &mut W,
) -> anyhow::Result<()> {
    if !session.is_dialogue_line_type(LineType::Text) {
        return Ok(());
    }
    let clipped = session.get_clipped_line_text();

    if shown.is_empty() && !clipped.is_empty() && session.line_has_active_actor() {
        let name = session
            .get_active_actor_info("name")
            .map(|v| v.to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| session.get_active_line_actor_id().to_string());
        write!(out, "{}:", name)?;
    }

    if let Some(rest) = clipped.strip_prefix(shown.as_str()) {
        write!(out, "{}", rest)?;
    } else {
        // 续行会把游标退回一格，已输出的部分保持不变
        debug!("显示文本与已输出文本不一致");
    }
    if clipped.len() > shown.len() {
        *shown = clipped.to_string();
    }
    out.flush()?;
    Ok(())
}

fn wait_for_enter<I: BufRead>(input: &mut I) -> anyhow::Result<bool> {
    let mut line = String::new();
    Ok(input.read_line(&mut line)? > 0)
}

/// 显示选项并读取一次选择；返回 `false` 表示输入已结束
fn choose_option<R, I, W>(
    session: &mut DialogueSession<R>,
    options: &PlayOptions,
    input: &mut I,
    out: &mut W,
) -> anyhow::Result<bool>
where
    R: DialogueRunner,
    I: BufRead,
    W: Write,
{
    session.has_selected_option_changed();
    let count = session.get_line_options_count();
    write!(
        out,
        "{}",
        session.get_line_options_text_vertical(&options.option_cursor)
    )?;
    write!(out, "选择 (1-{}，直接回车确认当前项): ", count)?;
    out.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }

    let answer = line.trim();
    if !answer.is_empty() {
        match answer.parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => session.select_option(n - 1),
            _ => {
                writeln!(out, "无效的选择: {}", answer)?;
                return Ok(true);
            }
        }
    }

    session.has_selected_option_changed();
    session.confirm_select_option();
    Ok(true)
}

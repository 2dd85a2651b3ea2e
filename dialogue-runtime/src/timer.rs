//! # Timer 模块
//!
//! `<<wait>>` 暂停的计时模型。
//!
//! 会话不读取真实时间：暂停时产出 [`WaitRequest`]，由宿主计时，
//! 到期后用对应的 [`WaitTicket`] 调用 `resume_wait`。
//! [`WaitClock`] 是宿主可直接使用的倒计时器。

use std::time::Duration;

/// 排队命令的标识
pub type CommandId = u64;

/// 等待凭据
///
/// `generation` 在每次开始/停止对话时递增，旧凭据因此失效。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WaitTicket {
    pub generation: u64,
    pub command: CommandId,
}

/// 等待请求
#[derive(Debug, Clone, PartialEq)]
pub struct WaitRequest {
    pub ticket: WaitTicket,
    pub delay: Duration,
}

/// 倒计时器
#[derive(Debug, Clone, Default)]
pub struct WaitClock {
    pending: Vec<(WaitTicket, Duration)>,
}

impl WaitClock {
    /// 创建空计时器
    pub fn new() -> Self {
        Self::default()
    }

    /// 开始计时
    pub fn arm(&mut self, request: WaitRequest) {
        self.pending.push((request.ticket, request.delay));
    }

    /// 推进时间，返回到期的凭据（按登记顺序）
    pub fn advance(&mut self, elapsed: Duration) -> Vec<WaitTicket> {
        let mut expired = Vec::new();
        self.pending.retain_mut(|(ticket, remaining)| {
            *remaining = remaining.saturating_sub(elapsed);
            if remaining.is_zero() {
                expired.push(*ticket);
                false
            } else {
                true
            }
        });
        expired
    }

    /// 是否没有进行中的计时
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// 取消所有计时
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(command: CommandId, ms: u64) -> WaitRequest {
        WaitRequest {
            ticket: WaitTicket {
                generation: 1,
                command,
            },
            delay: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_advance_expires_in_order() {
        let mut clock = WaitClock::new();
        clock.arm(request(1, 100));
        clock.arm(request(2, 50));

        assert!(clock.advance(Duration::from_millis(40)).is_empty());
        let expired = clock.advance(Duration::from_millis(10));
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].command, 2);

        let expired = clock.advance(Duration::from_millis(100));
        assert_eq!(expired[0].command, 1);
        assert!(clock.is_idle());
    }

    #[test]
    fn test_zero_delay_expires_immediately() {
        let mut clock = WaitClock::new();
        clock.arm(request(7, 0));
        assert_eq!(clock.advance(Duration::ZERO).len(), 1);
    }
}

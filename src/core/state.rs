//! 会话阶段：Idle → AwaitingFeedback | Dispatching → Idle

use serde::Serialize;

/// 单个会话所处阶段（会话锁内读写）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    /// 正在写入反馈并重训闸门
    AwaitingFeedback,
    /// 正在调用 TaskExecutor / Completion
    Dispatching,
}

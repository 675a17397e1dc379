//! 单个会话的上下文：对话日志 + 绑定的 Agent + 当前阶段 + 意图闸门句柄
//!
//! 只在会话锁内被访问；闸门句柄与其它会话共享（分类器本身是 copy-on-write）。

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::conversation::{ConversationState, Turn};
use crate::agent::AgentProfile;
use crate::core::SessionPhase;
use crate::gate::IntentGate;

/// 会话 ID
pub type SessionId = String;

pub struct SessionContext {
    pub id: SessionId,
    conversation: ConversationState,
    /// initialize 传入的全部 Agent；第一个为活跃 Agent
    agents: Vec<AgentProfile>,
    phase: SessionPhase,
    gate: Arc<IntentGate>,
    last_active: Instant,
}

impl SessionContext {
    pub fn new(id: SessionId, gate: Arc<IntentGate>) -> Self {
        Self {
            id,
            conversation: ConversationState::new(),
            agents: Vec::new(),
            phase: SessionPhase::Idle,
            gate,
            last_active: Instant::now(),
        }
    }

    /// 绑定 Agent 列表，返回数量；空列表等于解除绑定
    pub fn bind(&mut self, agents: Vec<AgentProfile>) -> usize {
        self.agents = agents;
        self.touch();
        self.agents.len()
    }

    pub fn active_agent(&self) -> Option<&AgentProfile> {
        self.agents.first()
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn append(&mut self, turn: Turn) {
        self.conversation.push(turn);
    }

    pub fn gate(&self) -> &Arc<IntentGate> {
        &self.gate
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn set_phase(&mut self, phase: SessionPhase) {
        tracing::debug!(session = %self.id, from = ?self.phase, to = ?phase, "session phase");
        self.phase = phase;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// 会话是否过期
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_active.elapsed() > timeout
    }
}

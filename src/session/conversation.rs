//! 会话内对话日志：按到达顺序只追加的 Turn 序列
//!
//! 与短期记忆不同，这里不做剪枝：Turn 一经追加不改、不删、不重排，会话结束时整体丢弃。

use serde::{Deserialize, Serialize};

/// 说话方
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Agent => "agent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn agent(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    turns: Vec<Turn>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// 下游生成用的上下文：每行 `role: content`，最旧的在前
    pub fn context_prompt(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", t.role.as_str(), t.content))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_prompt_oldest_first() {
        let mut conv = ConversationState::new();
        conv.push(Turn::user("store hours?"));
        conv.push(Turn::agent("9 to 5."));
        conv.push(Turn::user("and on sunday?"));
        assert_eq!(
            conv.context_prompt(),
            "user: store hours?\nagent: 9 to 5.\nuser: and on sunday?"
        );
    }

    #[test]
    fn test_empty_conversation() {
        let conv = ConversationState::new();
        assert!(conv.is_empty());
        assert_eq!(conv.context_prompt(), "");
    }
}

//! Mock LLM 客户端（用于测试与无 API Key 的本地运行）
//!
//! 取最后一条 User 消息原样回显，便于本地跑通闸门 + 分发流程。

use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        let last_line = last_user.lines().last().unwrap_or(last_user);
        Ok(format!("Echo from Mock: {}", last_line))
    }
}

//! TaskExecutor 能力：以某个 Agent 身份执行一次任务
//!
//! 失败分两类：Validation（可恢复，上报为分发失败）与 Other（原样向上传播）。

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{AgentProfile, TaskRequest};
use crate::core::ExecutionError;
use crate::llm::{LlmClient, Message};

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// 执行任务，返回执行器的原始产出
    async fn run(&self, agent: &AgentProfile, request: &TaskRequest) -> Result<String, ExecutionError>;
}

/// 用 LLM 直接完成任务：人设作为 system prompt，任务描述 + 期望输出作为 user 消息
pub struct LlmTaskExecutor {
    llm: Arc<dyn LlmClient>,
}

impl LlmTaskExecutor {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl TaskExecutor for LlmTaskExecutor {
    async fn run(&self, agent: &AgentProfile, request: &TaskRequest) -> Result<String, ExecutionError> {
        if request.description.trim().is_empty() {
            return Err(ExecutionError::Validation("task description is empty".to_string()));
        }
        if agent.role.trim().is_empty() {
            return Err(ExecutionError::Validation("agent role is empty".to_string()));
        }

        let messages = task_messages(agent, request);
        let output = self.llm.complete(&messages).await.map_err(ExecutionError::Other)?;
        if agent.verbose {
            tracing::info!(role = %agent.role, output = %output, "task executed");
        }
        Ok(output)
    }
}

/// 人设为 system；有对话记录时放在任务描述之前
fn task_messages(agent: &AgentProfile, request: &TaskRequest) -> Vec<Message> {
    let mut body = String::new();
    if let Some(context) = &request.context {
        body.push_str("Conversation so far:\n");
        body.push_str(context);
        body.push_str("\n\n");
    }
    body.push_str(&format!(
        "{}\n\nExpected output: {}",
        request.description, request.expected_output
    ));
    vec![Message::system(agent.persona_prompt()), Message::user(body)]
}

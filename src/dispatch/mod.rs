//! 任务分发：把被放行的用户消息交给 TaskExecutor，再用完整对话上下文向 Completion 取回复
//!
//! 两次外部调用都带超时；超时与执行器校验失败属于可恢复的分发失败（DispatchError::Failed），
//! 其余执行器 / Completion 错误原样向上传播。不做自动重试。

pub mod completion;
pub mod executor;

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::agent::{AgentProfile, TaskRequest};
use crate::core::{DispatchError, ExecutionError};
use crate::session::ConversationState;

pub use completion::{Completion, CompletionResponse, LlmCompletion};
pub use executor::{LlmTaskExecutor, TaskExecutor};

const DEFAULT_EXPECTED_OUTPUT: &str = "A personalized response to the user's request.";

/// 任务分发器：持有两个外部能力与各自的超时
pub struct TaskDispatcher {
    executor: Arc<dyn TaskExecutor>,
    completion: Arc<dyn Completion>,
    executor_timeout: Duration,
    completion_timeout: Duration,
    expected_output: String,
}

impl TaskDispatcher {
    pub fn new(executor: Arc<dyn TaskExecutor>, completion: Arc<dyn Completion>) -> Self {
        Self {
            executor,
            completion,
            executor_timeout: Duration::from_secs(60),
            completion_timeout: Duration::from_secs(60),
            expected_output: DEFAULT_EXPECTED_OUTPUT.to_string(),
        }
    }

    pub fn with_timeouts(mut self, executor: Duration, completion: Duration) -> Self {
        self.executor_timeout = executor;
        self.completion_timeout = completion;
        self
    }

    pub fn with_expected_output(mut self, expected_output: impl Into<String>) -> Self {
        self.expected_output = expected_output.into();
        self
    }

    /// 执行一次分发；history 应已包含本条用户消息
    pub async fn dispatch(
        &self,
        agent: &AgentProfile,
        message: &str,
        history: &ConversationState,
    ) -> Result<String, DispatchError> {
        let start = Instant::now();
        let mut request = TaskRequest::for_message(message, &self.expected_output);
        if agent.memory {
            request = request.with_context(history.context_prompt());
        }

        match timeout(self.executor_timeout, self.executor.run(agent, &request)).await {
            Ok(Ok(output)) => {
                tracing::debug!(role = %agent.role, chars = output.len(), "task executor finished");
            }
            Ok(Err(ExecutionError::Validation(msg))) => {
                tracing::warn!(role = %agent.role, error = %msg, "task validation failed");
                return Err(DispatchError::Failed(msg));
            }
            Ok(Err(ExecutionError::Other(msg))) => {
                tracing::error!(role = %agent.role, error = %msg, "task executor error");
                return Err(DispatchError::Executor(msg));
            }
            Err(_) => {
                tracing::warn!(role = %agent.role, timeout_secs = self.executor_timeout.as_secs(), "task executor timed out");
                return Err(DispatchError::Failed(format!(
                    "task execution timed out after {}s",
                    self.executor_timeout.as_secs()
                )));
            }
        }

        let prompt = history.context_prompt();
        let response = match timeout(self.completion_timeout, self.completion.invoke(agent, &prompt)).await {
            Ok(Ok(response)) => response,
            Ok(Err(msg)) => {
                tracing::error!(role = %agent.role, error = %msg, "completion error");
                return Err(DispatchError::Completion(msg));
            }
            Err(_) => {
                tracing::warn!(role = %agent.role, timeout_secs = self.completion_timeout.as_secs(), "completion timed out");
                return Err(DispatchError::Failed(format!(
                    "completion timed out after {}s",
                    self.completion_timeout.as_secs()
                )));
            }
        };

        let reply = response.into_text();
        tracing::info!(
            role = %agent.role,
            turns = history.len(),
            reply_chars = reply.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "dispatch completed"
        );
        Ok(reply)
    }
}

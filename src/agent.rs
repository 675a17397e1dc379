//! Agent 身份与组件装配
//!
//! AgentProfile 是初始化时传入的静态人设（role / goal / backstory + 能力开关），
//! TaskRequest 由每条被闸门放行的用户消息生成，交给 TaskExecutor 后即丢弃。
//! create_orchestrator 从配置装配 LLM、反馈存储、意图闸门与分发器，供 REPL 与 HTTP 入口共用。

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::dispatch::{LlmCompletion, LlmTaskExecutor, TaskDispatcher};
use crate::feedback::{FeedbackStore, JsonFeedbackStore};
use crate::gate::IntentGate;
use crate::llm::create_llm_from_config;
use crate::session::SessionOrchestrator;

/// Agent 人设（创建后不可变）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub role: String,
    pub goal: String,
    pub backstory: String,
    #[serde(default)]
    pub verbose: bool,
    /// 开启后任务携带此前的对话记录
    #[serde(default)]
    pub memory: bool,
}

impl AgentProfile {
    pub fn new(role: impl Into<String>, goal: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            goal: goal.into(),
            backstory: backstory.into(),
            verbose: false,
            memory: false,
        }
    }

    /// 作为 system prompt 的人设描述
    pub fn persona_prompt(&self) -> String {
        format!(
            "You are {}.\nGoal: {}\nBackstory: {}",
            self.role.trim(),
            self.goal.trim(),
            self.backstory.trim()
        )
    }
}

/// 由用户消息派生的一次性任务
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TaskRequest {
    pub description: String,
    pub expected_output: String,
    /// 截至本条消息的对话记录（`role: content` 行），仅 memory 开启的 Agent 才有
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl TaskRequest {
    pub fn for_message(message: &str, expected_output: &str) -> Self {
        Self {
            description: format!("Respond to the user's request: {}", message),
            expected_output: expected_output.to_string(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        let context = context.into();
        self.context = (!context.trim().is_empty()).then_some(context);
        self
    }
}

/// 从配置装配完整的会话编排器：语料 → 闸门训练，LLM → 执行器 / Completion
pub fn create_orchestrator(cfg: &AppConfig) -> SessionOrchestrator {
    let llm = create_llm_from_config(cfg);

    let store: Arc<dyn FeedbackStore> = Arc::new(JsonFeedbackStore::new(&cfg.gate.corpus_path));
    let corpus = store.load_all();
    tracing::info!(
        path = %cfg.gate.corpus_path.display(),
        examples = corpus.len(),
        "feedback corpus loaded"
    );
    let gate = Arc::new(IntentGate::from_corpus(cfg.gate.clone(), &corpus));

    let dispatcher = TaskDispatcher::new(
        Arc::new(LlmTaskExecutor::new(llm.clone())),
        Arc::new(LlmCompletion::new(llm)),
    )
    .with_timeouts(
        Duration::from_secs(cfg.dispatch.executor_timeout_secs),
        Duration::from_secs(cfg.dispatch.completion_timeout_secs),
    )
    .with_expected_output(cfg.dispatch.expected_output.clone());

    SessionOrchestrator::new(gate, store, Arc::new(dispatcher), cfg.session.clone())
}

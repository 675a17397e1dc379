//! 会话编排器：意图闸门 + 任务分发 + 反馈重训
//!
//! 每个请求在会话锁内完整执行，阶段在任何出口都回到 Idle。
//! 反馈写盘与重训放在阻塞线程池，并由 retrain_lock 串行化，保证每次重训看到的语料包含此前所有已确认的追加。

use std::sync::{Arc, Mutex};

use super::context::SessionContext;
use super::conversation::{ConversationState, Turn};
use super::registry::SessionRegistry;
use crate::agent::AgentProfile;
use crate::api::{InitializeRequest, InitializeResponse, MessageRequest, MessageResponse, WelcomeResponse};
use crate::config::SessionSection;
use crate::core::{SessionError, SessionPhase};
use crate::dispatch::TaskDispatcher;
use crate::feedback::{FeedbackStore, LabeledExample, Label};
use crate::gate::IntentGate;

const NO_AGENT_MESSAGE: &str = "No agent available for interaction.";

pub struct SessionOrchestrator {
    registry: SessionRegistry,
    gate: Arc<IntentGate>,
    store: Arc<dyn FeedbackStore>,
    dispatcher: Arc<TaskDispatcher>,
    settings: SessionSection,
    retrain_lock: Arc<Mutex<()>>,
}

impl SessionOrchestrator {
    pub fn new(
        gate: Arc<IntentGate>,
        store: Arc<dyn FeedbackStore>,
        dispatcher: Arc<TaskDispatcher>,
        settings: SessionSection,
    ) -> Self {
        Self {
            registry: SessionRegistry::new(Arc::clone(&gate), settings.idle_timeout_secs),
            gate,
            store,
            dispatcher,
            settings,
            retrain_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn gate(&self) -> &Arc<IntentGate> {
        &self.gate
    }

    /// 绑定 Agent；第一个为活跃 Agent，空列表时会话保持未绑定
    pub async fn initialize(
        &self,
        session_id: &str,
        request: InitializeRequest,
    ) -> Result<InitializeResponse, SessionError> {
        let agents = request
            .agents
            .ok_or_else(|| SessionError::MalformedInput("missing field `agents`".to_string()))?;

        let handle = self.registry.get_or_create(session_id).await;
        let mut ctx = handle.lock().await;
        let count = ctx.bind(agents);
        tracing::info!(
            session = %session_id,
            agents = count,
            active = ctx.active_agent().map(|a| a.role.as_str()).unwrap_or("-"),
            "session initialized"
        );

        Ok(InitializeResponse {
            message: "Crew initialized".to_string(),
            agents: count,
            tasks: 0,
        })
    }

    pub async fn welcome(&self, session_id: &str) -> WelcomeResponse {
        let handle = self.registry.get_or_create(session_id).await;
        let ctx = handle.lock().await;
        let message = match ctx.active_agent() {
            Some(agent) => welcome_text(agent),
            None => NO_AGENT_MESSAGE.to_string(),
        };
        WelcomeResponse { message }
    }

    /// 当前对话日志副本
    pub async fn history(&self, session_id: &str) -> Option<ConversationState> {
        let handle = self.registry.get(session_id).await?;
        let ctx = handle.lock().await;
        Some(ctx.conversation().clone())
    }

    /// 处理一条消息；可恢复的分发失败渲染为 `{"error": ...}`
    pub async fn handle_message(
        &self,
        session_id: &str,
        request: MessageRequest,
    ) -> Result<MessageResponse, SessionError> {
        let message = match request.message.as_deref().map(str::trim) {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => return Err(SessionError::MalformedInput("missing field `message`".to_string())),
        };

        let handle = self.registry.get_or_create(session_id).await;
        let mut ctx = handle.lock().await;

        let outcome = if message.eq_ignore_ascii_case(self.settings.feedback_keyword.trim()) {
            self.handle_feedback(&mut ctx, request.feedback).await
        } else {
            self.handle_query(&mut ctx, message).await
        };
        ctx.set_phase(SessionPhase::Idle);

        MessageResponse::from_outcome(outcome)
    }

    async fn handle_feedback(
        &self,
        ctx: &mut SessionContext,
        payload: Option<String>,
    ) -> Result<MessageResponse, SessionError> {
        ctx.set_phase(SessionPhase::AwaitingFeedback);

        let text = match payload.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => return Err(SessionError::MalformedInput("missing field `feedback`".to_string())),
        };

        let example = LabeledExample::new(text, Label::Related);
        let store = Arc::clone(&self.store);
        let gate = Arc::clone(&self.gate);
        let retrain_lock = Arc::clone(&self.retrain_lock);

        let report = tokio::task::spawn_blocking(move || {
            let _guard = retrain_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            store.append(&example)?;
            let corpus = store.load_all();
            Ok::<_, SessionError>(gate.retrain(&corpus))
        })
        .await
        .map_err(|e| SessionError::PersistenceUnavailable(format!("retrain task failed: {}", e)))??;

        tracing::info!(
            session = %ctx.id,
            corpus = report.as_ref().map(|r| r.corpus_size).unwrap_or(0),
            "feedback recorded"
        );
        Ok(MessageResponse::reply(self.settings.feedback_ack.clone()))
    }

    async fn handle_query(
        &self,
        ctx: &mut SessionContext,
        message: String,
    ) -> Result<MessageResponse, SessionError> {
        let agent = ctx.active_agent().cloned().ok_or(SessionError::NotInitialized)?;

        ctx.append(Turn::user(message.clone()));
        let label = ctx.gate().predict(&message);
        tracing::debug!(session = %ctx.id, label = label.as_str(), "intent classified");

        match label {
            Label::Related => {
                ctx.set_phase(SessionPhase::Dispatching);
                let reply = self
                    .dispatcher
                    .dispatch(&agent, &message, ctx.conversation())
                    .await?;
                ctx.append(Turn::agent(reply.clone()));
                Ok(MessageResponse::reply(reply))
            }
            Label::Unrelated => {
                let refusal = self.settings.refusal_message.clone();
                ctx.append(Turn::agent(refusal.clone()));
                Ok(MessageResponse::reply(refusal))
            }
        }
    }
}

fn welcome_text(agent: &AgentProfile) -> String {
    format!(
        "I am the {}, your assistant. I'm here to help with information about our products, promotions and policies. How can I help you today?",
        agent.role
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateSection;
    use crate::dispatch::{LlmCompletion, LlmTaskExecutor};
    use crate::feedback::MemoryFeedbackStore;
    use crate::llm::MockLlmClient;

    fn orchestrator(seed: Vec<LabeledExample>) -> SessionOrchestrator {
        let gate = Arc::new(IntentGate::from_corpus(GateSection::default(), &seed));
        let llm: Arc<dyn crate::llm::LlmClient> = Arc::new(MockLlmClient);
        let dispatcher = TaskDispatcher::new(
            Arc::new(LlmTaskExecutor::new(llm.clone())),
            Arc::new(LlmCompletion::new(llm)),
        );
        SessionOrchestrator::new(
            gate,
            Arc::new(MemoryFeedbackStore::new(seed)),
            Arc::new(dispatcher),
            SessionSection::default(),
        )
    }

    fn sales_agent() -> InitializeRequest {
        InitializeRequest {
            agents: Some(vec![AgentProfile::new("Sales Assistant", "Help customers", "Works at ABC")]),
        }
    }

    #[tokio::test]
    async fn test_welcome_unbound_and_bound() {
        let orch = orchestrator(Vec::new());
        assert_eq!(orch.welcome("s").await.message, NO_AGENT_MESSAGE);

        let resp = orch.initialize("s", sales_agent()).await.unwrap();
        assert_eq!(resp.agents, 1);
        assert_eq!(resp.tasks, 0);
        assert!(orch.welcome("s").await.message.starts_with("I am the Sales Assistant, your assistant."));
    }

    #[tokio::test]
    async fn test_initialize_without_agents_field_is_malformed() {
        let orch = orchestrator(Vec::new());
        let err = orch.initialize("s", InitializeRequest::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_initialize_with_zero_agents_stays_unbound() {
        let orch = orchestrator(Vec::new());
        let resp = orch
            .initialize("s", InitializeRequest { agents: Some(Vec::new()) })
            .await
            .unwrap();
        assert_eq!(resp.agents, 0);
        let err = orch.handle_message("s", MessageRequest::text("hello")).await.unwrap_err();
        assert_eq!(err, SessionError::NotInitialized);
    }

    #[tokio::test]
    async fn test_blank_message_is_malformed() {
        let orch = orchestrator(Vec::new());
        let err = orch.handle_message("s", MessageRequest::text("   ")).await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedInput(_)));
        let err = orch.handle_message("s", MessageRequest::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::MalformedInput(_)));
    }

    #[tokio::test]
    async fn test_keyword_matches_case_insensitively() {
        let orch = orchestrator(Vec::new());
        let resp = orch
            .handle_message("s", MessageRequest::feedback("  FeedBack ", "Do you sell gift cards?"))
            .await
            .unwrap();
        assert_eq!(resp, MessageResponse::reply("Thank you for your feedback!"));
        assert!(orch.gate().is_trained());
    }

    #[tokio::test]
    async fn test_feedback_without_payload_is_malformed_and_resets_phase() {
        let orch = orchestrator(Vec::new());
        let err = orch
            .handle_message("s", MessageRequest::text("feedback"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::MalformedInput(_)));

        let handle = orch.registry().get("s").await.unwrap();
        assert_eq!(handle.lock().await.phase(), SessionPhase::Idle);
    }

    #[tokio::test]
    async fn test_refusal_appends_two_turns() {
        let orch = orchestrator(vec![
            LabeledExample::new("What are your store hours?", Label::Related),
            LabeledExample::new("What's the weather?", Label::Unrelated),
        ]);
        orch.initialize("s", sales_agent()).await.unwrap();

        let resp = orch
            .handle_message("s", MessageRequest::text("What's the weather like?"))
            .await
            .unwrap();
        assert_eq!(resp, MessageResponse::reply(SessionSection::default().refusal_message));

        let history = orch.history("s").await.unwrap();
        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn test_related_message_dispatches_through_mock() {
        let orch = orchestrator(vec![
            LabeledExample::new("What are your store hours?", Label::Related),
            LabeledExample::new("What's the weather?", Label::Unrelated),
        ]);
        orch.initialize("s", sales_agent()).await.unwrap();

        let resp = orch
            .handle_message("s", MessageRequest::text("Do you have hours on weekends?"))
            .await
            .unwrap();
        match resp {
            MessageResponse::Reply { response } => assert!(response.starts_with("Echo from Mock:")),
            other => panic!("unexpected response: {other:?}"),
        }
        assert_eq!(orch.history("s").await.unwrap().len(), 2);
    }
}

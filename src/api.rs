//! 对外消息协议定义
//!
//! 传输层（REPL / HTTP）与 SessionOrchestrator 之间的请求 / 响应结构，字段名与 JSON 线格式一致。

use serde::{Deserialize, Serialize};

use crate::agent::AgentProfile;
use crate::core::SessionError;

/// 普通消息或反馈纠正：`{"message": "..."}` / `{"message": "feedback", "feedback": "..."}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: Option<String>,
    /// 仅当 message 为反馈关键字时读取
    #[serde(default)]
    pub feedback: Option<String>,
}

impl MessageRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            feedback: None,
        }
    }

    pub fn feedback(keyword: impl Into<String>, correction: impl Into<String>) -> Self {
        Self {
            message: Some(keyword.into()),
            feedback: Some(correction.into()),
        }
    }
}

/// `{"response": "..."}` 或分发失败时的 `{"error": "..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageResponse {
    Reply { response: String },
    Error { error: String },
}

impl MessageResponse {
    pub fn reply(text: impl Into<String>) -> Self {
        MessageResponse::Reply {
            response: text.into(),
        }
    }

    /// 把可恢复的分发失败渲染成 `{"error": ...}`，其余错误交给传输层
    pub fn from_outcome(outcome: Result<Self, SessionError>) -> Result<Self, SessionError> {
        match outcome {
            Err(SessionError::DispatchFailure(error)) => Ok(MessageResponse::Error { error }),
            other => other,
        }
    }
}

/// `{"agents": [AgentProfile, ...]}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InitializeRequest {
    #[serde(default)]
    pub agents: Option<Vec<AgentProfile>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub message: String,
    pub agents: usize,
    pub tasks: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

/// 传输层错误体
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: &'static str,
}

impl From<&SessionError> for ErrorBody {
    fn from(err: &SessionError) -> Self {
        let kind = match err {
            SessionError::NotInitialized => "not_initialized",
            SessionError::MalformedInput(_) => "malformed_input",
            SessionError::DispatchFailure(_) => "dispatch_failure",
            SessionError::PersistenceUnavailable(_) => "persistence_unavailable",
            SessionError::Executor(_) => "executor_error",
            SessionError::Completion(_) => "completion_error",
        };
        Self {
            error: err.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_response_wire_shapes() {
        let reply = serde_json::to_value(MessageResponse::reply("hi")).unwrap();
        assert_eq!(reply, serde_json::json!({"response": "hi"}));
        let error = serde_json::to_value(MessageResponse::Error { error: "bad".into() }).unwrap();
        assert_eq!(error, serde_json::json!({"error": "bad"}));
    }

    #[test]
    fn test_from_outcome_only_renders_dispatch_failure() {
        let rendered = MessageResponse::from_outcome(Err(SessionError::DispatchFailure("timeout".into())));
        assert_eq!(rendered, Ok(MessageResponse::Error { error: "timeout".into() }));
        assert_eq!(
            MessageResponse::from_outcome(Err(SessionError::NotInitialized)),
            Err(SessionError::NotInitialized)
        );
    }

    #[test]
    fn test_feedback_request_parses() {
        let req: MessageRequest =
            serde_json::from_str(r#"{"message": "feedback", "feedback": "Do you ship internationally?"}"#).unwrap();
        assert_eq!(req.message.as_deref(), Some("feedback"));
        assert_eq!(req.feedback.as_deref(), Some("Do you ship internationally?"));
    }
}

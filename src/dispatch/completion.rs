//! Completion 能力与回复形状归一化
//!
//! 后端回复可能是带 content 字段的结构体、带 text 字段的对象或纯文本；
//! 在边界处统一为 CompletionResponse，再由 into_text 归一成字符串。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::AgentProfile;
use crate::llm::{LlmClient, Message};

/// Completion 回复的三种形状
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionResponse {
    Structured { content: String },
    Textual { text: String },
    Raw(String),
}

impl CompletionResponse {
    /// 按 JSON 形状识别：对象含 content → Structured，含 text → Textual，字符串 → Raw，其它取字符串形式
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(mut map) => {
                if let Some(content) = map.remove("content") {
                    return CompletionResponse::Structured {
                        content: value_to_text(content),
                    };
                }
                if let Some(text) = map.remove("text") {
                    return CompletionResponse::Textual {
                        text: value_to_text(text),
                    };
                }
                CompletionResponse::Raw(Value::Object(map).to_string())
            }
            Value::String(s) => CompletionResponse::Raw(s),
            other => CompletionResponse::Raw(other.to_string()),
        }
    }

    /// LLM 的文本回复：若整体是 JSON 对象则按形状识别，否则视为纯文本
    pub fn from_reply(reply: String) -> Self {
        let trimmed = reply.trim_start();
        if trimmed.starts_with('{') {
            if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
                return Self::from_value(value);
            }
        }
        CompletionResponse::Raw(reply)
    }

    pub fn into_text(self) -> String {
        match self {
            CompletionResponse::Structured { content } => content,
            CompletionResponse::Textual { text } => text,
            CompletionResponse::Raw(s) => s,
        }
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[async_trait]
pub trait Completion: Send + Sync {
    async fn invoke(&self, agent: &AgentProfile, prompt: &str) -> Result<CompletionResponse, String>;
}

/// 基于 LlmClient 的 Completion：人设 + 对话上下文
pub struct LlmCompletion {
    llm: Arc<dyn LlmClient>,
}

impl LlmCompletion {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Completion for LlmCompletion {
    async fn invoke(&self, agent: &AgentProfile, prompt: &str) -> Result<CompletionResponse, String> {
        let messages = vec![Message::system(agent.persona_prompt()), Message::user(prompt)];
        let reply = self.llm.complete(&messages).await?;
        Ok(CompletionResponse::from_reply(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structured_content() {
        let r = CompletionResponse::from_value(json!({"content": "We open at 9.", "role": "assistant"}));
        assert_eq!(r, CompletionResponse::Structured { content: "We open at 9.".into() });
        assert_eq!(r.into_text(), "We open at 9.");
    }

    #[test]
    fn test_textual_object() {
        let r = CompletionResponse::from_value(json!({"text": "Hello"}));
        assert_eq!(r.into_text(), "Hello");
    }

    #[test]
    fn test_plain_and_fallback_shapes() {
        assert_eq!(CompletionResponse::from_value(json!("plain")).into_text(), "plain");
        assert_eq!(CompletionResponse::from_value(json!(42)).into_text(), "42");
        assert_eq!(
            CompletionResponse::from_value(json!({"answer": 1})).into_text(),
            r#"{"answer":1}"#
        );
    }

    #[test]
    fn test_reply_parsing() {
        assert_eq!(
            CompletionResponse::from_reply(r#"{"content": "structured"}"#.to_string()).into_text(),
            "structured"
        );
        assert_eq!(
            CompletionResponse::from_reply("{not json at all".to_string()),
            CompletionResponse::Raw("{not json at all".into())
        );
        assert_eq!(
            CompletionResponse::from_reply("We open at 9.".to_string()),
            CompletionResponse::Raw("We open at 9.".into())
        );
    }
}

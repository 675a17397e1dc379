//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::AppConfig;

pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::OpenAiClient;
pub use traits::LlmClient;

/// 根据配置与环境变量选择 LLM 后端（OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let provider = cfg.llm.provider.to_lowercase();
    let api_key = std::env::var("OPENAI_API_KEY").ok();

    match (provider.as_str(), api_key) {
        ("mock", _) => {
            tracing::info!("Using Mock LLM (configured)");
            Arc::new(MockLlmClient)
        }
        (_, Some(key)) => {
            tracing::info!(model = %cfg.llm.model, "Using OpenAI-compatible LLM");
            Arc::new(OpenAiClient::new(
                cfg.llm.base_url.as_deref(),
                &cfg.llm.model,
                Some(&key),
            ))
        }
        (_, None) => {
            tracing::warn!("OPENAI_API_KEY not set, using Mock LLM");
            Arc::new(MockLlmClient)
        }
    }
}

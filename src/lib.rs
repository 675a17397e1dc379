//! Bee Gate - 意图门控对话服务
//!
//! 模块划分：
//! - **agent**: Agent 人设、一次性任务与组件装配
//! - **api**: 传输层消息协议
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型与会话阶段
//! - **dispatch**: 任务执行器 / Completion 能力与分发器
//! - **feedback**: 标注样本与反馈持久化
//! - **gate**: TF-IDF + 朴素贝叶斯意图闸门
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **session**: 会话上下文、注册表与编排器

pub mod agent;
pub mod api;
pub mod config;
pub mod core;
pub mod dispatch;
pub mod feedback;
pub mod gate;
pub mod llm;
pub mod observability;
pub mod session;

pub use agent::{create_orchestrator, AgentProfile};
pub use session::SessionOrchestrator;

//! 会话层：对话日志、会话上下文、注册表与编排器

pub mod context;
pub mod conversation;
pub mod orchestrator;
pub mod registry;

pub use context::{SessionContext, SessionId};
pub use conversation::{ConversationState, Turn, TurnRole};
pub use orchestrator::SessionOrchestrator;
pub use registry::{SessionHandle, SessionRegistry};

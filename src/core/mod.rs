//! 核心类型层：错误分类与会话阶段

pub mod error;
pub mod state;

pub use error::{DispatchError, ExecutionError, FeedbackError, SessionError};
pub use state::SessionPhase;

//! 错误类型：会话层、分发层、外部执行器、反馈持久化
//!
//! 会话层 SessionError 是对调用方暴露的唯一错误面；其余错误在边界处映射过来。

use thiserror::Error;

/// 会话编排对调用方暴露的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// 尚未通过 initialize 绑定 Agent
    #[error("Session not initialized: no agent bound")]
    NotInitialized,

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// 可恢复的分发失败（执行器校验失败 / 外部调用超时），会话状态不受影响
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),

    #[error("Feedback store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Task executor error: {0}")]
    Executor(String),

    #[error("Completion error: {0}")]
    Completion(String),
}

/// TaskDispatcher 的结果错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// 可恢复：执行器校验失败或外部调用超时
    #[error("{0}")]
    Failed(String),

    #[error("executor: {0}")]
    Executor(String),

    #[error("completion: {0}")]
    Completion(String),
}

/// TaskExecutor 能力的失败分类
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{0}")]
    Other(String),
}

/// 反馈存储写入失败
#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("empty feedback text")]
    EmptyText,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 已有语料文件无法按数组解析；拒绝追加，避免覆盖原有记录
    #[error("corrupt feedback file {path}: {reason}")]
    Corrupt { path: String, reason: String },
}

impl From<DispatchError> for SessionError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Failed(msg) => SessionError::DispatchFailure(msg),
            DispatchError::Executor(msg) => SessionError::Executor(msg),
            DispatchError::Completion(msg) => SessionError::Completion(msg),
        }
    }
}

impl From<FeedbackError> for SessionError {
    fn from(err: FeedbackError) -> Self {
        match err {
            FeedbackError::EmptyText => SessionError::MalformedInput(err.to_string()),
            other => SessionError::PersistenceUnavailable(other.to_string()),
        }
    }
}

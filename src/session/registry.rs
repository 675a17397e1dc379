//! 会话注册表：session_id -> 会话上下文
//!
//! 每个会话一把 tokio Mutex，同一会话的请求在锁上串行，保证对话日志不交错、同一时刻最多一次分发。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use super::context::{SessionContext, SessionId};
use crate::gate::IntentGate;

pub type SessionHandle = Arc<Mutex<SessionContext>>;

pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
    gate: Arc<IntentGate>,
    /// 会话过期时间
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(gate: Arc<IntentGate>, idle_timeout_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            gate,
            idle_timeout: Duration::from_secs(idle_timeout_secs),
        }
    }

    /// 新建一个随机 ID 的会话
    pub async fn create(&self) -> SessionId {
        let id = format!("session_{}", uuid::Uuid::new_v4());
        self.get_or_create(&id).await;
        id
    }

    pub async fn get(&self, session_id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(session_id).cloned()
    }

    /// 获取或创建会话
    pub async fn get_or_create(&self, session_id: &str) -> SessionHandle {
        if let Some(handle) = self.get(session_id).await {
            return handle;
        }
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                tracing::info!(session = %session_id, "session created");
                Arc::new(Mutex::new(SessionContext::new(
                    session_id.to_string(),
                    Arc::clone(&self.gate),
                )))
            })
            .clone()
    }

    /// 结束会话，对话日志随之销毁
    pub async fn remove(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// 清理过期会话；正在处理请求（锁被占用）的会话跳过
    pub async fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let expired: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, handle)| {
                handle
                    .try_lock()
                    .map(|ctx| ctx.is_expired(self.idle_timeout))
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired sessions removed");
        }
        expired.len()
    }

    /// 获取活跃会话数
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GateSection;

    fn registry(idle_timeout_secs: u64) -> SessionRegistry {
        SessionRegistry::new(Arc::new(IntentGate::new(GateSection::default())), idle_timeout_secs)
    }

    #[tokio::test]
    async fn test_get_or_create_returns_same_handle() {
        let reg = registry(3600);
        let a = reg.get_or_create("s1").await;
        let b = reg.get_or_create("s1").await;
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.active_count().await, 1);
    }

    #[tokio::test]
    async fn test_create_generates_unique_ids() {
        let reg = registry(3600);
        let a = reg.create().await;
        let b = reg.create().await;
        assert_ne!(a, b);
        assert!(a.starts_with("session_"));
        assert!(reg.get(&a).await.is_some());
    }

    #[tokio::test]
    async fn test_cleanup_expired_skips_busy_sessions() {
        let reg = registry(0);
        let busy = reg.get_or_create("busy").await;
        reg.get_or_create("idle").await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        let _guard = busy.lock().await;
        assert_eq!(reg.cleanup_expired().await, 1);
        assert!(reg.get("busy").await.is_some());
        assert!(reg.get("idle").await.is_none());
    }

    #[tokio::test]
    async fn test_remove() {
        let reg = registry(3600);
        reg.get_or_create("s1").await;
        assert!(reg.remove("s1").await);
        assert!(!reg.remove("s1").await);
    }
}

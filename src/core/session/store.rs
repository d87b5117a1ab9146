//! 会话存储模块
//!
//! 内存会话存储：每个会话 ID 对应一把独立的互斥锁，不存在全局锁。
//! 同一会话的并发请求按顺序执行，不同会话之间完全并行。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::types::Session;

/// 会话句柄
///
/// 持有句柄并加锁期间，该会话的读-改-写是原子的。
pub type SessionHandle = Arc<Mutex<Session>>;

/// 内存会话存储
///
/// 使用 DashMap 保存 `会话 ID -> Arc<Mutex<Session>>`
///
/// # 特点
/// * 按会话加锁 - 同一会话串行，不同会话并行
/// * 懒创建 - 第一次访问时创建
/// * 可选过期 - 定期清理空闲会话
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    /// 会话存储（ID -> Session）
    sessions: Arc<DashMap<String, SessionHandle>>,
}

impl InMemorySessionStore {
    /// 创建新的内存会话存储
    pub fn new() -> Self {
        info!("内存会话存储创建成功");
        Self::default()
    }

    /// 存储类型名称
    pub fn kind(&self) -> &'static str {
        "in_memory"
    }

    /// 获取会话句柄，不存在时创建
    ///
    /// # 参数说明
    /// * `session_id` - 会话 ID
    ///
    /// # 返回值
    /// 会话句柄；调用方加锁后读写会话
    pub fn handle(&self, session_id: &str) -> SessionHandle {
        self.sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!(session_id = %session_id, "创建新会话");
                Arc::new(Mutex::new(Session::new(session_id)))
            })
            .value()
            .clone()
    }

    /// 获取会话快照，不存在时创建
    pub async fn get_or_create(&self, session_id: &str) -> Session {
        let handle = self.handle(session_id);
        let session = handle.lock().await;
        session.clone()
    }

    /// 保存会话（整体替换）
    pub async fn save(&self, session: Session) {
        let handle = self.handle(&session.id);
        let mut current = handle.lock().await;
        debug!(session_id = %session.id, messages = session.messages.len(), "保存会话");
        *current = session;
        current.touch();
    }

    /// 重置会话：历史只保留系统提示词并清除游标
    ///
    /// 会话不存在时创建一个新的空会话；重复调用结果相同。
    pub async fn reset(&self, session_id: &str) {
        let handle = self.handle(session_id);
        let mut session = handle.lock().await;
        session.reset();
        info!(session_id = %session_id, "会话已重置");
    }

    /// 会话数量
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// 是否没有会话
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// 清理过期会话
    ///
    /// 只清理没有外部句柄（没有正在进行的对话）的空闲会话。
    /// `expire_seconds` 为 0 时不清理。
    ///
    /// # 返回值
    /// 被清理的会话数量
    pub fn cleanup_expired(&self, expire_seconds: u64) -> usize {
        if expire_seconds == 0 {
            return 0;
        }

        let mut removed_count = 0;
        self.sessions.retain(|id, handle| {
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            let expired = handle
                .try_lock()
                .map(|session| session.is_expired(expire_seconds))
                .unwrap_or(false);
            if expired {
                removed_count += 1;
                debug!(session_id = %id, "会话已过期，清理");
            }
            !expired
        });

        if removed_count > 0 {
            info!(removed = removed_count, remaining = self.sessions.len(), "过期会话清理完成");
        }
        removed_count
    }
}

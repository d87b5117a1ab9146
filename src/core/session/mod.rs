//! 会话管理模块
//!
//! - types：会话数据结构
//! - store：按会话加锁的内存存储

pub mod store;
pub mod types;

pub use store::{InMemorySessionStore, SessionHandle};
pub use types::{now_millis, Session};

//! 会话模块
//!
//! 实现聊天后端的会话接口调用与客户端会话状态管理

pub mod api;
pub mod listener;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型和函数
pub use api::{ChatApi, ConversationApi};
pub use listener::{ConversationListener, EmptyConversationListener};
pub use models::{ChatMessage, Conversation, ConversationSummary, MessageRole};
pub use service::{ConversationStore, SendOutcome, SendRejection};
pub use types::{SendMessageReq, SendMessageResp, UpdateTitleReq};

pub mod client;
pub mod conversation;
pub mod serialization;
pub mod types;

// 重新导出会话相关类型
pub use conversation::{
    ChatApi, ConversationApi, ConversationListener, ConversationStore, ConversationSummary,
    SendOutcome, SendRejection,
};

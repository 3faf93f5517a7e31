pub mod chat;

// 重新导出常用类型和函数，方便外部使用
pub use chat::{
    client::{ChatClient, ClientConfig},
    conversation::{
        ChatApi, ChatMessage, Conversation, ConversationApi, ConversationListener,
        ConversationStore, ConversationSummary, MessageRole, SendOutcome, SendRejection,
    },
};

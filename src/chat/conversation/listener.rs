//! 会话监听器回调接口

use crate::chat::conversation::models::{Conversation, ConversationSummary};
use async_trait::async_trait;

/// 会话监听器回调接口
///
/// 会话存储状态变化后回调，由界面层（CLI 等）实现
#[async_trait]
pub trait ConversationListener: Send + Sync {
    /// 会话列表变更
    async fn on_conversation_list_changed(&self, conversations: Vec<ConversationSummary>);

    /// 当前打开的会话变更（None 表示新对话/未选中）
    async fn on_current_conversation_changed(&self, conversation: Option<Conversation>);

    /// 发送状态变更
    async fn on_sending_changed(&self, sending: bool);

    /// 发送失败，参数为错误描述
    async fn on_send_failed(&self, error: String);
}

/// 空实现（默认监听器）
pub struct EmptyConversationListener;

#[async_trait]
impl ConversationListener for EmptyConversationListener {
    async fn on_conversation_list_changed(&self, _conversations: Vec<ConversationSummary>) {}
    async fn on_current_conversation_changed(&self, _conversation: Option<Conversation>) {}
    async fn on_sending_changed(&self, _sending: bool) {}
    async fn on_send_failed(&self, _error: String) {}
}

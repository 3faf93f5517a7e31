//! 会话 API DTO（请求和响应结构体）

use crate::chat::conversation::models::{ChatMessage, Conversation};
use serde::{Deserialize, Serialize};

/// 会话列表响应：服务器返回完整会话数组，客户端投影为列表项
pub type AllConversationsResp = Vec<Conversation>;

/// 发送消息请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageReq {
    /// 为空时服务器创建新会话
    pub conversation_id: Option<String>,
    pub message: String,
    /// 新会话标题，已有会话时为空
    pub title: Option<String>,
}

/// 发送消息响应（用户消息与 AI 回复一次性返回，不做流式）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageResp {
    pub conversation_id: String,
    pub user_message: ChatMessage,
    pub ai_message: ChatMessage,
}

/// 修改标题请求
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateTitleReq {
    pub title: String,
}

//! 会话本地模型定义

use crate::chat::serialization::{deserialize_optional_timestamp, deserialize_timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 消息角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// 单条聊天消息
/// 可以直接从服务器返回的 JSON 反序列化，缺失的头像字段为 None
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// 消息 ID（服务器分配）
    pub id: String,
    /// 角色：user 或 assistant，客户端不校验交替顺序
    pub role: MessageRole,
    /// Markdown 格式的正文
    pub content: String,
    /// 发送时间
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// 头像 URL
    #[serde(default)]
    pub avatar: Option<String>,
}

/// 完整会话（含全部消息）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    /// 会话 ID（服务器分配，不透明字符串）
    pub id: String,
    pub title: String,
    /// 按插入顺序排列，会话内只追加
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// 最后一条消息内容，没有消息时为空字符串
    pub fn last_message_preview(&self) -> String {
        self.messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default()
    }
}

/// 会话列表项（侧边栏展示用），由 Conversation 投影得到，客户端不单独持久化
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    /// 最新消息预览
    #[serde(default)]
    pub last_message: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&Conversation> for ConversationSummary {
    fn from(conv: &Conversation) -> Self {
        Self {
            id: conv.id.clone(),
            title: conv.title.clone(),
            last_message: conv.last_message_preview(),
            updated_at: conv.updated_at,
        }
    }
}

impl From<&ConversationSummary> for Conversation {
    /// 降级：只有列表项信息时构造一个没有消息的会话
    fn from(summary: &ConversationSummary) -> Self {
        Self {
            id: summary.id.clone(),
            title: summary.title.clone(),
            messages: Vec::new(),
            created_at: None,
            updated_at: summary.updated_at,
        }
    }
}

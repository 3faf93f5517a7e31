//! 会话 HTTP API 客户端
//!
//! 负责所有会话相关的 HTTP 请求。读操作失败时降级为空值（空列表、None、false）并记录日志，
//! 只有发送消息会把错误抛给调用方

use crate::chat::conversation::models::{Conversation, ConversationSummary};
use crate::chat::conversation::types::{
    AllConversationsResp, SendMessageReq, SendMessageResp, UpdateTitleReq,
};
use crate::chat::types::{handle_http_response, handle_status_response};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, error, info};
use uuid::Uuid;

/// 聊天后端接口
///
/// 会话存储只依赖这个 trait，方便替换为其他后端实现
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// 获取会话列表，失败时返回空列表
    async fn list_conversations(&self) -> Vec<ConversationSummary>;

    /// 获取完整会话，失败时返回 None
    async fn get_conversation(&self, conversation_id: &str) -> Option<Conversation>;

    /// 发送消息并获取 AI 回复；`conversation_id` 为空时服务器创建新会话
    async fn send_message(
        &self,
        conversation_id: Option<&str>,
        message: &str,
        title: Option<&str>,
    ) -> Result<SendMessageResp>;

    /// 删除会话，返回是否成功
    async fn delete_conversation(&self, conversation_id: &str) -> bool;

    /// 修改会话标题，返回是否成功
    async fn update_title(&self, conversation_id: &str, title: &str) -> bool;
}

/// 会话相关的 HTTP API 客户端
pub struct ConversationApi {
    client: reqwest::Client,
    api_base_url: String,
}

impl ConversationApi {
    /// 创建新的会话 API 客户端
    ///
    /// `backend_url` 为后端根地址，接口统一挂在 `{backend_url}/api` 下
    pub fn new(client: reqwest::Client, backend_url: &str) -> Self {
        Self {
            client,
            api_base_url: format!("{}/api", backend_url.trim_end_matches('/')),
        }
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// 拼接接口地址，每个路径段单独做百分号编码（会话 ID 中的 `/`、`?` 等不会破坏路径）
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base_url)
            .with_context(|| format!("无效的接口地址: {}", self.api_base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("接口地址不能拼接路径: {}", self.api_base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// 从服务器获取全部会话并投影为列表项
    pub async fn try_list_conversations(&self) -> Result<Vec<ConversationSummary>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["conversations"])?;

        info!("[ChatAPI] 📡 请求会话列表");
        debug!("[ChatAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let conversations =
            handle_http_response::<AllConversationsResp>(response, "会话列表").await?;

        info!("[ChatAPI] ✅ 会话列表响应，会话数: {}", conversations.len());
        debug!(
            "[ChatAPI]   会话ID列表: {:?}",
            conversations.iter().map(|c| &c.id).collect::<Vec<_>>()
        );

        Ok(conversations.iter().map(ConversationSummary::from).collect())
    }

    /// 从服务器获取单个会话（含全部消息）
    pub async fn try_get_conversation(&self, conversation_id: &str) -> Result<Conversation> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["conversations", conversation_id])?;

        info!("[ChatAPI] 📡 请求会话详情: {}", conversation_id);
        debug!("[ChatAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .get(url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        let conversation = handle_http_response::<Conversation>(response, "会话详情").await?;

        info!(
            "[ChatAPI] ✅ 会话详情响应，会话ID: {}, 消息数: {}",
            conversation.id,
            conversation.messages.len()
        );

        Ok(conversation)
    }

    /// 删除会话
    pub async fn try_delete_conversation(&self, conversation_id: &str) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["conversations", conversation_id])?;

        info!("[ChatAPI] 📡 请求删除会话: {}", conversation_id);
        debug!("[ChatAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .delete(url)
            .header("operationID", &operation_id)
            .send()
            .await
            .context("请求失败")?;

        handle_status_response(response, "删除会话").await
    }

    /// 修改会话标题
    ///
    /// 标题同时放在 JSON body 和 query 参数里，兼容两种后端写法
    pub async fn try_update_title(&self, conversation_id: &str, title: &str) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["conversations", conversation_id, "title"])?;

        info!("[ChatAPI] 📡 请求修改会话标题: {}", conversation_id);
        debug!(
            "[ChatAPI]   请求URL: {}, 新标题: {}, 操作ID: {}",
            url, title, operation_id
        );

        let response = self
            .client
            .put(url)
            .header("operationID", &operation_id)
            .query(&[("title", title)])
            .json(&UpdateTitleReq {
                title: title.to_string(),
            })
            .send()
            .await
            .context("请求失败")?;

        handle_status_response(response, "修改会话标题").await
    }
}

#[async_trait]
impl ChatApi for ConversationApi {
    async fn list_conversations(&self) -> Vec<ConversationSummary> {
        match self.try_list_conversations().await {
            Ok(list) => list,
            Err(e) => {
                error!("[ChatAPI] 获取会话列表失败: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn get_conversation(&self, conversation_id: &str) -> Option<Conversation> {
        match self.try_get_conversation(conversation_id).await {
            Ok(conv) => Some(conv),
            Err(e) => {
                error!(
                    "[ChatAPI] 获取会话详情失败，会话ID: {}, 错误: {:#}",
                    conversation_id, e
                );
                None
            }
        }
    }

    async fn send_message(
        &self,
        conversation_id: Option<&str>,
        message: &str,
        title: Option<&str>,
    ) -> Result<SendMessageResp> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.endpoint(&["chat", "send"])?;

        info!(
            "[ChatAPI] 📤 发送消息\n   请求URL: {}\n   会话ID: {:?}\n   标题: {:?}\n   操作ID: {}",
            url, conversation_id, title, operation_id
        );

        let req = SendMessageReq {
            conversation_id: conversation_id.map(str::to_string),
            message: message.to_string(),
            title: title.map(str::to_string),
        };

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(&req)
            .send()
            .await
            .context("发送消息请求失败")?;

        let resp = handle_http_response::<SendMessageResp>(response, "发送消息").await?;

        info!(
            "[ChatAPI] ✅ 发送消息成功，会话ID: {}, 用户消息ID: {}, AI消息ID: {}",
            resp.conversation_id, resp.user_message.id, resp.ai_message.id
        );

        Ok(resp)
    }

    async fn delete_conversation(&self, conversation_id: &str) -> bool {
        match self.try_delete_conversation(conversation_id).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "[ChatAPI] 删除会话失败，会话ID: {}, 错误: {:#}",
                    conversation_id, e
                );
                false
            }
        }
    }

    async fn update_title(&self, conversation_id: &str, title: &str) -> bool {
        match self.try_update_title(conversation_id, title).await {
            Ok(()) => true,
            Err(e) => {
                error!(
                    "[ChatAPI] 修改会话标题失败，会话ID: {}, 错误: {:#}",
                    conversation_id, e
                );
                false
            }
        }
    }
}

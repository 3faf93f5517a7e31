//! 聊天客户端入口
//!
//! 根据配置创建 HTTP 客户端，组装会话 API 与会话存储

use crate::chat::conversation::api::{ChatApi, ConversationApi};
use crate::chat::conversation::listener::{ConversationListener, EmptyConversationListener};
use crate::chat::conversation::service::ConversationStore;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// 后端根地址，接口路径为 `{backend_url}/api/...`
    pub backend_url: String,
    /// 单个请求超时时间，None 表示不超时
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8001")
    }
}

/// 聊天客户端
#[derive(Clone)]
pub struct ChatClient {
    config: ClientConfig,
    api: Arc<ConversationApi>,
    store: Arc<ConversationStore>,
}

impl ChatClient {
    /// 创建客户端（使用默认空监听器）
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_listener(config, Arc::new(EmptyConversationListener))
    }

    /// 创建客户端（带自定义会话监听器）
    pub fn with_listener(
        config: ClientConfig,
        listener: Arc<dyn ConversationListener>,
    ) -> Result<Self> {
        let mut builder = reqwest::ClientBuilder::new();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().context("创建 HTTP 客户端失败")?;

        let api = Arc::new(ConversationApi::new(http_client, &config.backend_url));
        info!(
            "[Client] 创建聊天客户端，接口地址: {}, 超时: {:?}",
            api.api_base_url(),
            config.request_timeout
        );
        let store = Arc::new(ConversationStore::with_listener(api.clone(), listener));

        Ok(Self { config, api, store })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 会话 API（无状态，可直接调用）
    pub fn api(&self) -> Arc<ConversationApi> {
        self.api.clone()
    }

    /// 会话存储
    pub fn store(&self) -> Arc<ConversationStore> {
        self.store.clone()
    }

    /// 修改会话标题，只调用接口，不改动会话存储
    pub async fn rename_conversation(&self, conversation_id: &str, title: &str) -> bool {
        self.api.update_title(conversation_id, title).await
    }
}

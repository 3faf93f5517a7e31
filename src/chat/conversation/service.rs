//! 会话存储服务层
//!
//! 维护会话列表、当前打开的会话以及发送状态。所有状态变更都经过这里的操作完成：
//! 先请求服务器，拿到响应后再合并到本地状态，请求失败时本地状态保持不变

use crate::chat::conversation::api::ChatApi;
use crate::chat::conversation::listener::{ConversationListener, EmptyConversationListener};
use crate::chat::conversation::models::{Conversation, ConversationSummary};
use crate::chat::conversation::types::SendMessageResp;
use crate::chat::serialization::derive_title;
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 发送被拒绝的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    /// 已有一条消息在发送中
    Busy,
    /// 内容为空或只有空白字符
    EmptyText,
}

/// 发送消息的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// 消息追加到已打开的会话
    Appended { conversation_id: String },
    /// 服务器新建了会话并设为当前会话
    Created { conversation_id: String },
    /// 未发出请求，状态未改变
    Rejected(SendRejection),
}

#[derive(Default)]
struct StoreState {
    /// 按更新时间倒序
    conversations: Vec<ConversationSummary>,
    current: Option<Conversation>,
    /// 每次切换当前会话自增，用于丢弃过期的会话详情响应
    view_seq: u64,
    /// 最近一次尚未返回的打开请求对应的会话 ID
    pending_select: Option<String>,
}

/// 发送中标记，离开作用域时自动复位
///
/// 正常结束走 `release` 并通知监听器；发送 future 被中途丢弃时，
/// 在 drop 中复位标记并另起任务补发通知
struct SendingGuard<'a> {
    flag: &'a AtomicBool,
    listener: Arc<dyn ConversationListener>,
    released: bool,
}

impl<'a> SendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool, listener: &Arc<dyn ConversationListener>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self {
                flag,
                listener: listener.clone(),
                released: false,
            })
    }

    async fn release(mut self) {
        self.flag.store(false, Ordering::SeqCst);
        self.released = true;
        self.listener.on_sending_changed(false).await;
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        if self.released {
            return;
        }
        warn!("[ChatStore] ⚠️ 发送被中途取消，复位发送状态");
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let listener = self.listener.clone();
            handle.spawn(async move {
                listener.on_sending_changed(false).await;
            });
        }
    }
}

/// 会话存储
pub struct ConversationStore {
    api: Arc<dyn ChatApi>,
    listener: Arc<dyn ConversationListener>,
    state: Mutex<StoreState>,
    sending: AtomicBool,
}

impl ConversationStore {
    /// 创建新的会话存储（使用默认空监听器）
    pub fn new(api: Arc<dyn ChatApi>) -> Self {
        Self::with_listener(api, Arc::new(EmptyConversationListener))
    }

    /// 创建新的会话存储（带自定义监听器）
    pub fn with_listener(api: Arc<dyn ChatApi>, listener: Arc<dyn ConversationListener>) -> Self {
        Self {
            api,
            listener,
            state: Mutex::new(StoreState::default()),
            sending: AtomicBool::new(false),
        }
    }

    /// 会话列表快照
    pub async fn conversations(&self) -> Vec<ConversationSummary> {
        self.state.lock().await.conversations.clone()
    }

    /// 当前打开的会话快照
    pub async fn current(&self) -> Option<Conversation> {
        self.state.lock().await.current.clone()
    }

    pub fn is_sending(&self) -> bool {
        self.sending.load(Ordering::SeqCst)
    }

    /// 按标题过滤会话列表（不区分大小写），空关键字返回全部
    pub async fn search_conversations(&self, term: &str) -> Vec<ConversationSummary> {
        let term = term.trim().to_lowercase();
        let state = self.state.lock().await;
        state
            .conversations
            .iter()
            .filter(|c| term.is_empty() || c.title.to_lowercase().contains(&term))
            .cloned()
            .collect()
    }

    /// 从服务器重新加载会话列表
    ///
    /// 读取失败时 API 层返回空列表，这里照常覆盖为空
    pub async fn refresh_conversations(&self) -> Vec<ConversationSummary> {
        info!("[ChatStore] 🔄 刷新会话列表");
        let list = self.api.list_conversations().await;
        {
            let mut state = self.state.lock().await;
            state.conversations = list.clone();
        }
        info!("[ChatStore] ✅ 会话列表已刷新，会话数: {}", list.len());
        self.listener.on_conversation_list_changed(list.clone()).await;
        list
    }

    /// 打开会话
    ///
    /// 拉取完整会话失败时，降级为用列表项构造的会话（消息可能不完整）。
    /// 若响应返回前又切换了会话，则丢弃该响应并返回 false
    pub async fn select_conversation(&self, summary: &ConversationSummary) -> bool {
        let seq = {
            let mut state = self.state.lock().await;
            state.view_seq += 1;
            state.pending_select = Some(summary.id.clone());
            state.view_seq
        };
        info!("[ChatStore] 📂 打开会话: {} (seq={})", summary.id, seq);

        let conversation = match self.api.get_conversation(&summary.id).await {
            Some(conv) => conv,
            None => {
                warn!(
                    "[ChatStore] ⚠️ 获取会话详情失败，使用列表项降级显示: {}",
                    summary.id
                );
                Conversation::from(summary)
            }
        };

        {
            let mut state = self.state.lock().await;
            if state.view_seq != seq {
                info!(
                    "[ChatStore] 丢弃过期的会话详情响应: {} (seq={}, 最新={})",
                    summary.id, seq, state.view_seq
                );
                return false;
            }
            state.pending_select = None;
            state.current = Some(conversation.clone());
        }

        self.listener
            .on_current_conversation_changed(Some(conversation))
            .await;
        true
    }

    /// 开始新对话：清空当前会话，不影响会话列表
    pub async fn new_chat(&self) {
        {
            let mut state = self.state.lock().await;
            state.view_seq += 1;
            state.pending_select = None;
            state.current = None;
        }
        info!("[ChatStore] 🆕 开始新对话");
        self.listener.on_current_conversation_changed(None).await;
    }

    /// 删除会话
    ///
    /// 只有服务器确认成功才从列表移除；删除的是当前会话时同时清空当前会话，
    /// 正在打开的同一会话的响应也会被丢弃
    pub async fn delete_conversation(&self, conversation_id: &str) -> bool {
        info!("[ChatStore] 🗑️ 删除会话: {}", conversation_id);
        if !self.api.delete_conversation(conversation_id).await {
            warn!(
                "[ChatStore] 删除会话失败，本地状态保持不变: {}",
                conversation_id
            );
            return false;
        }

        let (list, current_cleared) = {
            let mut state = self.state.lock().await;
            state.conversations.retain(|c| c.id != conversation_id);
            if state.pending_select.as_deref() == Some(conversation_id) {
                state.view_seq += 1;
                state.pending_select = None;
            }
            let current_cleared = state
                .current
                .as_ref()
                .is_some_and(|c| c.id == conversation_id);
            if current_cleared {
                state.current = None;
            }
            (state.conversations.clone(), current_cleared)
        };

        self.listener.on_conversation_list_changed(list).await;
        if current_cleared {
            self.listener.on_current_conversation_changed(None).await;
        }
        true
    }

    /// 发送消息
    ///
    /// 同一时间只允许一条消息在发送中；空白内容直接忽略。
    /// 请求失败时会话状态不变，错误返回给调用方
    pub async fn send_message(&self, text: &str) -> Result<SendOutcome> {
        if self.is_sending() {
            info!("[ChatStore] 已有消息发送中，忽略本次发送");
            return Ok(SendOutcome::Rejected(SendRejection::Busy));
        }
        if text.trim().is_empty() {
            debug!("[ChatStore] 消息内容为空，忽略本次发送");
            return Ok(SendOutcome::Rejected(SendRejection::EmptyText));
        }
        let Some(guard) = SendingGuard::acquire(&self.sending, &self.listener) else {
            info!("[ChatStore] 已有消息发送中，忽略本次发送");
            return Ok(SendOutcome::Rejected(SendRejection::Busy));
        };
        self.listener.on_sending_changed(true).await;

        let outcome = self.send_and_reconcile(text).await;

        guard.release().await;

        if let Err(e) = &outcome {
            error!("[ChatStore] ❌ 发送消息失败: {:#}", e);
            self.listener.on_send_failed(format!("{:#}", e)).await;
        }
        outcome
    }

    async fn send_and_reconcile(&self, text: &str) -> Result<SendOutcome> {
        let (current_id, seq) = {
            let state = self.state.lock().await;
            (state.current.as_ref().map(|c| c.id.clone()), state.view_seq)
        };
        let title = current_id.is_none().then(|| derive_title(text));

        info!(
            "[ChatStore] 📤 发送消息，当前会话: {:?}, 新会话标题: {:?}",
            current_id, title
        );

        let resp = self
            .api
            .send_message(current_id.as_deref(), text, title.as_deref())
            .await?;

        match current_id {
            Some(_) => Ok(self.reconcile_append(resp).await),
            None => Ok(self.reconcile_created(resp, title.unwrap_or_default(), seq).await),
        }
    }

    /// 已有会话：追加两条消息，刷新列表项并移到列表最前
    async fn reconcile_append(&self, resp: SendMessageResp) -> SendOutcome {
        let conversation_id = resp.conversation_id.clone();
        let updated_at = resp.ai_message.timestamp;
        let preview = resp.ai_message.content.clone();

        let (list, current) = {
            let mut state = self.state.lock().await;

            let mut current_changed = false;
            if let Some(current) = state
                .current
                .as_mut()
                .filter(|c| c.id == conversation_id)
            {
                current.messages.push(resp.user_message);
                current.messages.push(resp.ai_message);
                current.updated_at = updated_at;
                current_changed = true;
            }

            let position = state
                .conversations
                .iter()
                .position(|c| c.id == conversation_id);
            let summary = match position {
                Some(pos) => {
                    let mut summary = state.conversations.remove(pos);
                    summary.updated_at = updated_at;
                    summary.last_message = preview;
                    Some(summary)
                }
                None => state
                    .current
                    .as_ref()
                    .filter(|c| c.id == conversation_id)
                    .map(ConversationSummary::from),
            };
            if let Some(summary) = summary {
                state.conversations.insert(0, summary);
            }

            let current = if current_changed {
                state.current.clone()
            } else {
                None
            };
            (state.conversations.clone(), current)
        };

        info!("[ChatStore] ✅ 消息已追加到会话: {}", conversation_id);
        if let Some(current) = current {
            self.listener
                .on_current_conversation_changed(Some(current))
                .await;
        }
        self.listener.on_conversation_list_changed(list).await;

        SendOutcome::Appended { conversation_id }
    }

    /// 新会话：拉取服务器创建的会话，设为当前会话并插到列表最前
    async fn reconcile_created(&self, resp: SendMessageResp, title: String, seq: u64) -> SendOutcome {
        let conversation_id = resp.conversation_id.clone();

        let conversation = match self.api.get_conversation(&conversation_id).await {
            Some(conv) => conv,
            None => {
                warn!(
                    "[ChatStore] ⚠️ 获取新会话失败，使用发送响应构造会话: {}",
                    conversation_id
                );
                Conversation {
                    id: conversation_id.clone(),
                    title,
                    created_at: Some(resp.user_message.timestamp),
                    updated_at: resp.ai_message.timestamp,
                    messages: vec![resp.user_message, resp.ai_message],
                }
            }
        };

        let (list, current) = {
            let mut state = self.state.lock().await;
            state.conversations.retain(|c| c.id != conversation_id);
            state
                .conversations
                .insert(0, ConversationSummary::from(&conversation));

            // 发送期间用户切换过会话时，不抢占当前会话
            let current = if state.view_seq == seq {
                state.view_seq += 1;
                state.pending_select = None;
                state.current = Some(conversation);
                state.current.clone()
            } else {
                info!(
                    "[ChatStore] 发送期间已切换会话，新会话仅加入列表: {}",
                    conversation_id
                );
                None
            };
            (state.conversations.clone(), current)
        };

        info!("[ChatStore] ✅ 新会话已创建: {}", conversation_id);
        if let Some(current) = current {
            self.listener
                .on_current_conversation_changed(Some(current))
                .await;
        }
        self.listener.on_conversation_list_changed(list).await;

        SendOutcome::Created { conversation_id }
    }
}

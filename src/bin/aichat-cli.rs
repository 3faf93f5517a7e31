//! AI 聊天 CLI 客户端
//!
//! 子命令直接调用会话接口；不带子命令时进入交互模式，
//! 通过会话存储完成打开、新建、删除、发送等操作

use aichat_sdk_core_rust::chat::conversation::listener::ConversationListener;
use aichat_sdk_core_rust::{
    ChatApi, ChatClient, ClientConfig, Conversation, ConversationStore, ConversationSummary,
    MessageRole, SendOutcome, SendRejection,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

/// AI 聊天 CLI 客户端
#[derive(Parser, Debug)]
#[command(name = "aichat-cli")]
#[command(about = "AI 聊天 CLI 客户端 - 会话列表、消息收发", long_about = None)]
struct Args {
    /// 后端地址（接口位于 {backend_url}/api）
    #[arg(long, env = "BACKEND_URL", default_value = "http://localhost:8001")]
    backend_url: String,

    /// 请求超时（秒），0 表示不超时
    #[arg(long, default_value = "0")]
    timeout_secs: u64,

    /// 日志级别（默认: warn,aichat_sdk_core_rust=info）
    #[arg(long, default_value = "warn,aichat_sdk_core_rust=info")]
    log_level: String,

    /// 日志文件
    #[arg(long, default_value = "debug.log")]
    log_file: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 列出所有会话
    List,
    /// 查看会话的全部消息
    Show { conversation_id: String },
    /// 发送一条消息（不指定会话时创建新会话）
    Send {
        #[arg(short, long)]
        conversation: Option<String>,
        message: String,
    },
    /// 删除会话
    Delete { conversation_id: String },
    /// 修改会话标题
    Rename {
        conversation_id: String,
        title: String,
    },
    /// 交互模式（默认）
    Chat,
}

/// 初始化日志（同时输出到 stderr 和文件）
fn init_logger(log_level: &str, log_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 创建日志文件（追加模式）
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("无法创建日志文件 {}", log_file))?;

    // 控制台输出走 stderr，避免和聊天内容混在一起
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    // 输出到文件，禁用 ANSI 颜色代码
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::sync::Mutex::new(file))
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .init();

    info!("[CLI] 📝 日志已同时输出到控制台和文件: {}", log_file);
    Ok(())
}

fn print_conversation_list(conversations: &[ConversationSummary]) {
    if conversations.is_empty() {
        println!("（暂无会话）");
        return;
    }
    for (i, conv) in conversations.iter().enumerate() {
        let preview: String = conv.last_message.chars().take(30).collect();
        println!(
            "{:>3}. {} | {} | {} | {}",
            i + 1,
            conv.title,
            conv.updated_at.format("%Y-%m-%d %H:%M"),
            preview.replace('\n', " "),
            conv.id
        );
    }
}

fn print_conversation(conversation: &Conversation) {
    println!("=== {} ({}) ===", conversation.title, conversation.id);
    for msg in &conversation.messages {
        let who = match msg.role {
            MessageRole::User => "你",
            MessageRole::Assistant => "AI",
        };
        println!("[{}] {}:\n{}\n", msg.timestamp.format("%H:%M:%S"), who, msg.content);
    }
}

/// 交互模式下的会话监听器：把发送失败提示给用户
struct CliConversationListener;

#[async_trait::async_trait]
impl ConversationListener for CliConversationListener {
    async fn on_conversation_list_changed(&self, conversations: Vec<ConversationSummary>) {
        info!("[CLI/Conversation] 📋 会话列表变更，共 {} 个", conversations.len());
    }

    async fn on_current_conversation_changed(&self, conversation: Option<Conversation>) {
        match conversation {
            Some(conv) => info!("[CLI/Conversation] 📂 当前会话: {}", conv.id),
            None => info!("[CLI/Conversation] 🆕 新对话"),
        }
    }

    async fn on_sending_changed(&self, sending: bool) {
        if sending {
            println!("AI 正在思考...");
        }
    }

    async fn on_send_failed(&self, error: String) {
        println!("❌ 发送失败: {}", error);
    }
}

/// 解析序号（从 1 开始）或会话 ID
async fn resolve_conversation(
    store: &ConversationStore,
    key: &str,
) -> Option<ConversationSummary> {
    let conversations = store.conversations().await;
    if let Ok(index) = key.parse::<usize>() {
        if let Some(conv) = index.checked_sub(1).and_then(|i| conversations.get(i)) {
            return Some(conv.clone());
        }
    }
    conversations.into_iter().find(|c| c.id == key)
}

fn print_help() {
    println!(
        "命令:\n  /list            列出会话\n  /search <关键字>  按标题搜索\n  /open <序号|ID>   打开会话\n  /new             新对话\n  /delete <序号|ID> 删除会话\n  /rename <序号|ID> <标题>\n  /help            帮助\n  /quit            退出\n其他输入作为消息发送"
    );
}

async fn run_chat(client: &ChatClient) -> Result<()> {
    let store = client.store();
    let conversations = store.refresh_conversations().await;
    print_conversation_list(&conversations);
    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("读取输入失败")? {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        match cmd {
            "/quit" | "/exit" => break,
            "/help" => print_help(),
            "/list" => print_conversation_list(&store.refresh_conversations().await),
            "/search" => print_conversation_list(&store.search_conversations(rest).await),
            "/new" => {
                store.new_chat().await;
                println!("已开始新对话");
            }
            "/open" => match resolve_conversation(&store, rest).await {
                Some(summary) => {
                    if store.select_conversation(&summary).await {
                        if let Some(current) = store.current().await {
                            print_conversation(&current);
                        }
                    }
                }
                None => println!("找不到会话: {}", rest),
            },
            "/delete" => match resolve_conversation(&store, rest).await {
                Some(summary) => {
                    if store.delete_conversation(&summary.id).await {
                        println!("已删除: {}", summary.title);
                    } else {
                        println!("删除失败: {}", summary.title);
                    }
                }
                None => println!("找不到会话: {}", rest),
            },
            "/rename" => {
                let (key, title) = rest.split_once(' ').unwrap_or((rest, ""));
                match resolve_conversation(&store, key).await {
                    Some(summary) if !title.trim().is_empty() => {
                        if client.rename_conversation(&summary.id, title.trim()).await {
                            println!("已重命名为: {}", title.trim());
                            print_conversation_list(&store.refresh_conversations().await);
                        } else {
                            println!("重命名失败");
                        }
                    }
                    Some(_) => println!("用法: /rename <序号|ID> <标题>"),
                    None => println!("找不到会话: {}", key),
                }
            }
            _ if cmd.starts_with('/') => println!("未知命令: {}（/help 查看帮助）", cmd),
            _ => match store.send_message(line).await {
                Ok(SendOutcome::Rejected(SendRejection::EmptyText)) => {}
                Ok(SendOutcome::Rejected(SendRejection::Busy)) => println!("上一条消息还在发送中"),
                Ok(_) => {
                    if let Some(reply) = store
                        .current()
                        .await
                        .and_then(|c| c.messages.last().cloned())
                    {
                        println!("AI:\n{}\n", reply.content);
                    }
                }
                // 错误已由监听器提示
                Err(_) => {}
            },
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, &args.log_file)?;

    let mut config = ClientConfig::new(args.backend_url.clone());
    if args.timeout_secs > 0 {
        config = config.with_request_timeout(Duration::from_secs(args.timeout_secs));
    }
    info!("[CLI] 🚀 AI 聊天 CLI 客户端，后端: {}", config.backend_url);

    let client = ChatClient::with_listener(config, Arc::new(CliConversationListener))?;
    let api = client.api();

    match args.command.unwrap_or(Command::Chat) {
        Command::List => print_conversation_list(&api.list_conversations().await),
        Command::Show { conversation_id } => match api.get_conversation(&conversation_id).await {
            Some(conv) => print_conversation(&conv),
            None => println!("找不到会话: {}", conversation_id),
        },
        Command::Send {
            conversation,
            message,
        } => {
            let title = conversation
                .is_none()
                .then(|| aichat_sdk_core_rust::chat::serialization::derive_title(&message));
            let resp = api
                .send_message(conversation.as_deref(), &message, title.as_deref())
                .await
                .context("发送消息失败")?;
            println!("会话: {}", resp.conversation_id);
            println!("AI:\n{}", resp.ai_message.content);
        }
        Command::Delete { conversation_id } => {
            if api.delete_conversation(&conversation_id).await {
                println!("已删除: {}", conversation_id);
            } else {
                println!("删除失败: {}", conversation_id);
            }
        }
        Command::Rename {
            conversation_id,
            title,
        } => {
            if client.rename_conversation(&conversation_id, &title).await {
                println!("已重命名: {} -> {}", conversation_id, title);
            } else {
                println!("重命名失败: {}", conversation_id);
            }
        }
        Command::Chat => run_chat(&client).await?,
    }

    Ok(())
}

//! 长轮询机器人：接收语音或文本，执行流水线并回传结果

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::generator::context::PipelineContext;
use crate::generator::intake::observer::PipelineObserver;
use crate::generator::intake::types::{AgentType, ExtractionRecord, InputSource};
use crate::generator::outlet::{DiskOutlet, Outlet};
use crate::generator::workflow::{execute_pipeline, save_to_notion};
use crate::telegram::client::TelegramClient;
use crate::telegram::format::{
    HELP_TEXT, START_TEXT, STATUS_TEXT, TEXT_RECEIVED_TEXT, VOICE_RECEIVED_TEXT, format_error,
    format_notion_link, format_problem_preview, format_step, format_transcription,
};
use crate::telegram::types::{Message, Update};
use crate::transcription::Transcriber;

const POLL_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// 机器人命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Status,
    Unknown,
}

impl BotCommand {
    /// 解析以 `/` 开头的消息，兼容 `/start@bot_name` 形式；普通文本返回 None
    pub fn parse(text: &str) -> Option<Self> {
        let command = text.trim().strip_prefix('/')?;
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .split('@')
            .next()
            .unwrap_or_default();
        Some(match name {
            "start" => BotCommand::Start,
            "help" => BotCommand::Help,
            "status" => BotCommand::Status,
            _ => BotCommand::Unknown,
        })
    }

    fn reply(&self) -> Option<&'static str> {
        match self {
            BotCommand::Start => Some(START_TEXT),
            BotCommand::Help => Some(HELP_TEXT),
            BotCommand::Status => Some(STATUS_TEXT),
            BotCommand::Unknown => None,
        }
    }
}

/// 阶段描述，用于进度消息
fn step_description(agent_type: AgentType) -> &'static str {
    match agent_type {
        AgentType::ProblemExtractor => "Analyzing conversation and extracting information",
        AgentType::SearchPromptWriter => "Generating targeted research queries",
        AgentType::WebResearcher => "Conducting web research for relevant solutions",
    }
}

/// 把阶段进度推送到会话；推送失败只记录日志
struct TelegramProgress<'a> {
    client: &'a TelegramClient,
    chat_id: &'a str,
}

impl<'a> TelegramProgress<'a> {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.client.send_message(self.chat_id, text).await {
            warn!(chat_id = self.chat_id, "progress update failed: {}", e);
        }
    }
}

#[async_trait]
impl<'a> PipelineObserver for TelegramProgress<'a> {
    async fn on_stage_started(&self, agent_type: AgentType) {
        println!("🤖 Step {}/{}: {}", agent_type.step(), AgentType::TOTAL_STEPS, agent_type);
        self.notify(&format_step(
            agent_type.step(),
            AgentType::TOTAL_STEPS,
            step_description(agent_type),
        ))
        .await;
    }

    async fn on_extraction(&self, record: &ExtractionRecord) {
        if let Some(preview) = format_problem_preview(&record.problems) {
            self.notify(&preview).await;
        }
    }
}

pub struct TelegramBot {
    config: Config,
    client: TelegramClient,
    context: PipelineContext,
    transcriber: Transcriber,
    outlet: DiskOutlet,
    last_update_id: Option<i64>,
}

impl TelegramBot {
    pub fn new(config: Config) -> Result<Self> {
        config.require_llm()?;
        config.require_telegram_bot()?;
        let context = PipelineContext::new(config.clone())?;
        Ok(Self::with_context(config, context))
    }

    pub fn with_context(config: Config, context: PipelineContext) -> Self {
        Self {
            client: TelegramClient::new(&config.telegram),
            transcriber: Transcriber::new(&config.transcription),
            outlet: DiskOutlet::from_config(&config),
            context,
            config,
            last_update_id: None,
        }
    }

    /// 主循环，直到收到 Ctrl+C
    pub async fn run(&mut self) -> Result<()> {
        println!("🤖 VoiceFast Telegram Bot 启动中...");
        self.drain_pending().await;
        println!("✅ Bot已上线，只处理新消息。按 Ctrl+C 退出。");

        let poll_timeout = self.config.telegram.poll_timeout_seconds;
        loop {
            let offset = self.last_update_id.map(|id| id + 1);
            let updates = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!("👋 Bot正在退出...");
                    return Ok(());
                }
                updates = self.client.get_updates(offset, poll_timeout) => updates,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        self.last_update_id = Some(update.update_id);
                        self.handle_update(update).await;
                    }
                }
                Err(e) => {
                    error!("polling failed: {}", e);
                    tokio::time::sleep(POLL_ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// 启动时跳过队列中的旧消息
    async fn drain_pending(&mut self) {
        println!("🧹 正在清理积压的旧消息...");
        match self.client.get_updates(None, 1).await {
            Ok(updates) => match updates.iter().map(|u| u.update_id).max() {
                Some(highest) => {
                    self.last_update_id = Some(highest);
                    if let Err(e) = self.client.get_updates(Some(highest + 1), 1).await {
                        warn!("could not confirm drained updates: {}", e);
                    }
                    println!("✅ 已清理 {} 条旧消息", updates.len());
                }
                None => println!("✅ 没有积压的旧消息"),
            },
            Err(e) => {
                warn!("could not drain pending updates: {}", e);
                eprintln!("⚠️ 无法清理旧消息，继续运行");
            }
        }
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let chat_id = message.chat.id.to_string();

        if message.voice.is_some() {
            if let Err(e) = self.handle_voice(&chat_id, &message).await {
                self.report_failure(&chat_id, &e).await;
            }
        } else if let Some(text) = message.text.as_deref() {
            if let Some(command) = BotCommand::parse(text) {
                if let Some(reply) = command.reply() {
                    self.send_best_effort(&chat_id, reply).await;
                }
                return;
            }
            if let Err(e) = self.handle_text(&chat_id, text).await {
                self.report_failure(&chat_id, &e).await;
            }
        }
    }

    async fn handle_voice(&self, chat_id: &str, message: &Message) -> Result<()> {
        let Some(voice) = &message.voice else {
            return Ok(());
        };
        let sender = message
            .from
            .as_ref()
            .map(|user| user.display_name())
            .unwrap_or_default();
        info!(chat_id, sender = %sender, duration_s = voice.duration, "voice message received");

        self.send_best_effort(chat_id, VOICE_RECEIVED_TEXT).await;

        self.config.require_transcription()?;
        let audio = self.client.download_file(&voice.file_id).await?;
        println!("📥 已下载语音文件 ({} bytes)", audio.len());
        let text = self
            .transcriber
            .transcribe(audio, &format!("voice_{}.ogg", message.message_id))
            .await?;

        self.send_best_effort(chat_id, &format_transcription(&text)).await;
        self.process(chat_id, &text, InputSource::Voice).await
    }

    async fn handle_text(&self, chat_id: &str, text: &str) -> Result<()> {
        info!(chat_id, chars = text.chars().count(), "text message received");
        self.send_best_effort(chat_id, TEXT_RECEIVED_TEXT).await;
        self.process(chat_id, text, InputSource::Text).await
    }

    /// 执行流水线、保存、写Notion、回传报告
    async fn process(&self, chat_id: &str, text: &str, source: InputSource) -> Result<()> {
        let progress = TelegramProgress {
            client: &self.client,
            chat_id,
        };
        let run = execute_pipeline(&self.context, text, &progress).await?;

        let saved = self.outlet.save(&run.result, text).await?;
        let local_file = saved.json_path.to_string_lossy().into_owned();
        let notion_url = save_to_notion(&self.config, &run.result, source, Some(&local_file)).await;

        self.client.send_report(chat_id, &run.result).await?;
        if let Some(url) = notion_url {
            self.send_best_effort(chat_id, &format_notion_link(&url)).await;
        }
        println!("✅ 处理完成，结果已发送");
        Ok(())
    }

    async fn send_best_effort(&self, chat_id: &str, text: &str) {
        if let Err(e) = self.client.send_message(chat_id, text).await {
            warn!(chat_id, "failed to send message: {}", e);
        }
    }

    async fn report_failure(&self, chat_id: &str, error: &anyhow::Error) {
        error!(chat_id, "failed to process message: {:#}", error);
        self.send_best_effort(chat_id, &format_error(&error.to_string()))
            .await;
    }
}

/// 列出最近给机器人发过消息的会话
pub async fn list_chat_ids(config: &Config) -> Result<()> {
    config.require_telegram_bot()?;
    let client = TelegramClient::new(&config.telegram);
    let updates = client.get_updates(None, 0).await?;

    let messages: Vec<&Message> = updates.iter().filter_map(|u| u.message.as_ref()).collect();
    if messages.is_empty() {
        println!("没有找到消息，请先给机器人发送一条消息。");
        return Ok(());
    }

    println!("📱 最近的Telegram会话:");
    for message in messages {
        println!("Chat ID: {}", message.chat.id);
        if let Some(user) = &message.from {
            println!("From: {}", user.display_name());
            println!("Username: @{}", user.username.as_deref().unwrap_or("N/A"));
        }
        println!("---");
    }
    Ok(())
}

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::generator::context::PipelineContext;
use crate::generator::intake::observer::{ConsoleObserver, PipelineObserver};
use crate::generator::intake::orchestrator::{IntakeOrchestrator, IntakeRun};
use crate::generator::intake::types::{InputSource, PipelineResult, WorkflowInput};
use crate::generator::outlet::{DiskOutlet, Outlet, SavedOutputs};
use crate::notion::NotionClient;
use crate::telegram::TelegramClient;
use crate::transcription::Transcriber;

/// 未提供输入时使用的示例对话
pub const SAMPLE_INPUT: &str = "Hi, my name is Sarah Johnson, you can reach me on WhatsApp at +1-555-0123.
I work at TechStart Inc, and we're struggling with a few issues:

First, our customer support team is overwhelmed with repetitive questions,
taking up to 3 hours per day just answering the same basic queries.

Second, we don't have a good system for tracking customer feedback -
it's scattered across emails, Slack, and support tickets.

Third, our onboarding process for new customers takes too long,
about 2 weeks, and we're losing customers because of it.

We have a budget of around $10k, need solutions within the next month,
and our tech stack is Node.js and React. Our team is small - just 5 people.";

/// 流水线输入来源
#[derive(Debug, Clone, PartialEq)]
pub enum RunInput {
    Text(String),
    File(PathBuf),
    Audio(PathBuf),
    Sample,
}

/// 结果投递开关
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishOptions {
    pub notion: bool,
    pub telegram: bool,
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self {
            notion: true,
            telegram: true,
        }
    }
}

/// 一次投递的结果汇总
#[derive(Debug, Clone, PartialEq)]
pub struct Publication {
    pub saved: SavedOutputs,
    pub notion_url: Option<String>,
    pub telegram_sent: bool,
}

/// 把输入解析成对话文本，音频先转写
pub async fn resolve_input(config: &Config, input: RunInput) -> Result<(String, InputSource)> {
    match input {
        RunInput::Text(text) => Ok((text, InputSource::Text)),
        RunInput::Sample => Ok((SAMPLE_INPUT.to_string(), InputSource::Text)),
        RunInput::File(path) => {
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("无法读取输入文件: {}", path.display()))?;
            Ok((text.trim().to_string(), InputSource::Text))
        }
        RunInput::Audio(path) => {
            config.require_transcription()?;
            println!("🎤 正在转写音频: {}", path.display());
            let text = Transcriber::new(&config.transcription)
                .transcribe_file(&path)
                .await?;
            println!("✅ 转写完成");
            Ok((text, InputSource::Voice))
        }
    }
}

/// 执行三阶段流水线
pub async fn execute_pipeline(
    context: &PipelineContext,
    input_as_text: &str,
    observer: &dyn PipelineObserver,
) -> Result<IntakeRun> {
    let input = WorkflowInput {
        input_as_text: input_as_text.to_string(),
    };
    Ok(IntakeOrchestrator.execute(context, &input, observer).await?)
}

/// 写入Notion；未配置或已关闭时跳过，失败时返回 None
pub async fn save_to_notion(
    config: &Config,
    result: &PipelineResult,
    source: InputSource,
    local_file: Option<&str>,
) -> Option<String> {
    if let Err(e) = config.require_notion() {
        info!("notion not configured, skipping: {}", e);
        println!("💡 提示: 设置 NOTION_API_KEY 和 NOTION_DATABASE_ID 可将结果保存到Notion");
        return None;
    }

    println!("📝 正在保存到Notion...");
    let url = NotionClient::new(&config.notion)
        .save_with_retry(result, source, local_file)
        .await;
    match &url {
        Some(url) => println!("✅ Notion页面已创建: {}", url),
        None => eprintln!("⚠️ Notion保存失败（结果已保存在本地）"),
    }
    url
}

/// 保存本地文件，然后依次投递到Notion和Telegram。
///
/// 本地文件写入失败会返回错误；Notion和Telegram的失败只记录日志，互不影响。
pub async fn publish(
    config: &Config,
    result: &PipelineResult,
    input_as_text: &str,
    source: InputSource,
    options: PublishOptions,
) -> Result<Publication> {
    let saved = DiskOutlet::from_config(config)
        .save(result, input_as_text)
        .await?;
    let local_file = saved.json_path.to_string_lossy().into_owned();

    let notion_url = if options.notion {
        save_to_notion(config, result, source, Some(&local_file)).await
    } else {
        None
    };

    let telegram_sent = if options.telegram {
        send_to_telegram(config, result).await
    } else {
        false
    };

    Ok(Publication {
        saved,
        notion_url,
        telegram_sent,
    })
}

async fn send_to_telegram(config: &Config, result: &PipelineResult) -> bool {
    let chat_id = match config.require_telegram_chat() {
        Ok(chat_id) => chat_id,
        Err(e) => {
            info!("telegram not configured, skipping: {}", e);
            println!("💡 提示: 设置 TELEGRAM_API_KEY 和 TELEGRAM_CHAT_ID 可接收结果推送");
            return false;
        }
    };

    println!("📱 正在发送结果到Telegram...");
    match TelegramClient::new(&config.telegram)
        .send_report(chat_id, result)
        .await
    {
        Ok(()) => {
            println!("✅ Telegram消息已发送");
            true
        }
        Err(e) => {
            warn!("telegram delivery failed: {}", e);
            eprintln!("⚠️ Telegram发送失败（结果已保存在本地）: {}", e);
            false
        }
    }
}

/// 启动一次完整的接入流程：解析输入、执行流水线、保存并投递结果
pub async fn launch(config: &Config, input: RunInput, options: PublishOptions) -> Result<()> {
    config.require_llm()?;
    let context = PipelineContext::new(config.clone())?;

    let (input_as_text, source) = resolve_input(config, input).await?;
    println!("🚀 开始执行VoiceFast接入流程...");
    println!("📝 输入内容:\n{}\n", input_as_text);

    let started = Instant::now();
    let run = execute_pipeline(&context, &input_as_text, &ConsoleObserver).await?;
    println!("✅ 流程执行完毕，耗时 {:.1}秒", started.elapsed().as_secs_f64());

    println!("\n📊 结果:");
    println!("{}", serde_json::to_string_pretty(&run.result)?);

    publish(config, &run.result, &input_as_text, source, options).await?;
    Ok(())
}

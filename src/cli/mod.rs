use crate::config::{Config, LLMProvider};
use crate::generator::workflow::{PublishOptions, RunInput};
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// VoiceFast - 把一段对话变成联系人档案、问题清单和调研结果
#[derive(Parser, Debug)]
#[command(name = "voicefast")]
#[command(
    about = "Conversational intake pipeline: extracts contact details and problems from a conversation, then researches practical solutions."
)]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// 配置文件路径
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// 输出路径
    #[arg(short, long, global = true)]
    pub output_path: Option<PathBuf>,

    /// 是否启用详细日志
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// LLM Provider (openai, openrouter, anthropic, deepseek, ollama)
    #[arg(long, global = true)]
    pub llm_provider: Option<String>,

    /// LLM API KEY
    #[arg(long, global = true)]
    pub llm_api_key: Option<String>,

    /// LLM API基地址
    #[arg(long, global = true)]
    pub llm_api_base_url: Option<String>,

    /// 高能效模型，用于低推理强度的阶段
    #[arg(long, global = true)]
    pub model_efficient: Option<String>,

    /// 高质量模型，用于中高推理强度的阶段
    #[arg(long, global = true)]
    pub model_powerful: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// 对一段对话执行流水线
    Run(RunArgs),
    /// 启动Telegram长轮询机器人
    Bot,
    /// 列出最近给机器人发消息的会话ID
    ChatId,
    /// 检查Notion数据库是否可访问
    CheckNotion,
}

#[derive(clap::Args, Debug, Clone, PartialEq)]
pub struct RunArgs {
    /// 对话文本；不提供时使用内置示例
    pub text: Option<String>,

    /// 从文件读取对话文本
    #[arg(long, conflicts_with_all = ["text", "audio"])]
    pub input_file: Option<PathBuf>,

    /// 先转写音频文件再执行
    #[arg(long, conflicts_with = "text")]
    pub audio: Option<PathBuf>,

    /// 不写入Notion
    #[arg(long)]
    pub no_notion: bool,

    /// 不推送到Telegram
    #[arg(long)]
    pub no_telegram: bool,
}

impl RunArgs {
    /// 输入来源与投递开关
    pub fn request(&self) -> (RunInput, PublishOptions) {
        let input = if let Some(path) = &self.input_file {
            RunInput::File(path.clone())
        } else if let Some(path) = &self.audio {
            RunInput::Audio(path.clone())
        } else if let Some(text) = &self.text {
            RunInput::Text(text.clone())
        } else {
            RunInput::Sample
        };
        let options = PublishOptions {
            notion: !self.no_notion,
            telegram: !self.no_telegram,
        };
        (input, options)
    }
}

impl Args {
    /// 将CLI参数转换为配置
    pub fn into_config(self) -> Result<Config> {
        let mut config = if let Some(config_path) = &self.config {
            // 显式指定的配置文件必须可读
            Config::from_file(config_path)?
        } else {
            let default_config_path = std::env::current_dir()
                .unwrap_or_else(|_| PathBuf::from("."))
                .join("voicefast.toml");

            if default_config_path.exists() {
                Config::from_file(&default_config_path)?
            } else {
                Config::default()
            }
        };

        if let Some(output_path) = self.output_path {
            config.output_path = output_path;
        }

        // 覆盖LLM配置
        if let Some(provider_str) = self.llm_provider {
            config.llm.provider = provider_str.parse::<LLMProvider>()?;
        }
        if let Some(llm_api_base_url) = self.llm_api_base_url {
            config.llm.api_base_url = llm_api_base_url;
        }
        if let Some(llm_api_key) = self.llm_api_key {
            config.llm.api_key = llm_api_key;
        }
        if let Some(model_efficient) = self.model_efficient {
            config.llm.model_efficient = model_efficient;
        }
        if let Some(model_powerful) = self.model_powerful {
            config.llm.model_powerful = model_powerful;
        }

        config.verbose = config.verbose || self.verbose;

        Ok(config)
    }
}

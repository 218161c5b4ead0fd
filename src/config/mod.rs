use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use crate::error::ConfigError;

/// LLM Provider类型
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
pub enum LLMProvider {
    #[serde(rename = "openai")]
    #[default]
    OpenAI,
    #[serde(rename = "openrouter")]
    OpenRouter,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "deepseek")]
    DeepSeek,
    #[serde(rename = "ollama")]
    Ollama,
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::OpenRouter => write!(f, "openrouter"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::DeepSeek => write!(f, "deepseek"),
            LLMProvider::Ollama => write!(f, "ollama"),
        }
    }
}

impl std::str::FromStr for LLMProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(LLMProvider::OpenAI),
            "openrouter" => Ok(LLMProvider::OpenRouter),
            "anthropic" => Ok(LLMProvider::Anthropic),
            "deepseek" => Ok(LLMProvider::DeepSeek),
            "ollama" => Ok(LLMProvider::Ollama),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

/// 应用程序配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// 本地输出目录（JSON结果与Markdown报告）
    pub output_path: PathBuf,

    /// 是否额外生成Markdown报告
    pub save_markdown: bool,

    /// LLM模型配置
    pub llm: LLMConfig,

    /// Telegram配置
    pub telegram: TelegramConfig,

    /// Notion配置
    pub notion: NotionConfig,

    /// 语音转写配置
    pub transcription: TranscriptionConfig,

    /// 是否启用详细日志
    pub verbose: bool,
}

/// LLM模型配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct LLMConfig {
    /// LLM Provider类型
    pub provider: LLMProvider,

    /// LLM API KEY
    pub api_key: String,

    /// LLM API基地址
    pub api_base_url: String,

    /// 高能效模型，用于低推理强度的阶段（信息提取、联网调研）
    pub model_efficient: String,

    /// 高质量模型，用于中高推理强度的阶段（调研提示词生成）
    pub model_powerful: String,

    /// 最大tokens
    pub max_tokens: u32,

    /// 温度，推理模型通常不支持，默认不设置
    pub temperature: Option<f64>,

    /// 单次模型调用超时时间（秒）
    pub timeout_seconds: u64,

    /// 是否要求服务端保存响应（OpenAI Responses `store`）
    pub store: bool,
}

/// Telegram Bot配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot Token
    pub api_key: String,

    /// 默认推送的会话ID
    pub chat_id: Option<String>,

    pub api_base_url: String,

    /// 长轮询超时（秒）
    pub poll_timeout_seconds: u64,

    /// 单条消息最大长度
    pub max_message_length: usize,
}

/// Notion数据库配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct NotionConfig {
    pub api_key: String,

    pub database_id: String,

    pub api_base_url: String,

    /// Notion-Version 请求头
    pub notion_version: String,

    /// 重试次数
    pub retry_attempts: u32,

    /// 重试基础间隔（毫秒），第n次重试等待 n * retry_delay_ms
    pub retry_delay_ms: u64,
}

/// 语音转写配置
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub api_key: String,

    pub api_base_url: String,

    pub model: String,

    /// 转写语言，为空时由模型自动识别
    pub language: Option<String>,
}

fn env_or_default(key: &str) -> String {
    std::env::var(key).unwrap_or_default()
}

impl Config {
    /// 从文件加载配置
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let mut file =
            File::open(path).context(format!("Failed to open config file: {:?}", path))?;
        let mut content = String::new();
        file.read_to_string(&mut content)
            .context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// 运行流水线所需的模型凭据
    pub fn require_llm(&self) -> Result<(), ConfigError> {
        if self.llm.api_key.trim().is_empty() && self.llm.provider != LLMProvider::Ollama {
            return Err(ConfigError::MissingCredential {
                key: "llm.api_key",
                env: "OPENAI_API_KEY",
            });
        }
        Ok(())
    }

    /// 运行Telegram Bot所需的凭据
    pub fn require_telegram_bot(&self) -> Result<(), ConfigError> {
        if self.telegram.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "telegram.api_key",
                env: "TELEGRAM_API_KEY",
            });
        }
        Ok(())
    }

    /// 向固定会话推送结果所需的凭据
    pub fn require_telegram_chat(&self) -> Result<&str, ConfigError> {
        self.require_telegram_bot()?;
        match self.telegram.chat_id.as_deref() {
            Some(chat_id) if !chat_id.trim().is_empty() => Ok(chat_id),
            _ => Err(ConfigError::MissingCredential {
                key: "telegram.chat_id",
                env: "TELEGRAM_CHAT_ID",
            }),
        }
    }

    /// 写入Notion所需的凭据
    pub fn require_notion(&self) -> Result<(), ConfigError> {
        if self.notion.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "notion.api_key",
                env: "NOTION_API_KEY",
            });
        }
        if self.notion.database_id.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "notion.database_id",
                env: "NOTION_DATABASE_ID",
            });
        }
        Ok(())
    }

    /// 语音转写所需的凭据
    pub fn require_transcription(&self) -> Result<(), ConfigError> {
        if self.transcription.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential {
                key: "transcription.api_key",
                env: "OPENAI_API_KEY",
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("./output"),
            save_markdown: true,
            llm: LLMConfig::default(),
            telegram: TelegramConfig::default(),
            notion: NotionConfig::default(),
            transcription: TranscriptionConfig::default(),
            verbose: false,
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::default(),
            api_key: env_or_default("OPENAI_API_KEY"),
            api_base_url: String::from("https://api.openai.com/v1"),
            model_efficient: String::from("gpt-5"),
            model_powerful: String::from("gpt-5"),
            max_tokens: 16384,
            temperature: None,
            timeout_seconds: 300,
            store: true,
        }
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        let chat_id = env_or_default("TELEGRAM_CHAT_ID");
        Self {
            api_key: env_or_default("TELEGRAM_API_KEY"),
            chat_id: (!chat_id.is_empty()).then_some(chat_id),
            api_base_url: String::from("https://api.telegram.org"),
            poll_timeout_seconds: 30,
            max_message_length: 4096,
        }
    }
}

impl Default for NotionConfig {
    fn default() -> Self {
        Self {
            api_key: env_or_default("NOTION_API_KEY"),
            database_id: env_or_default("NOTION_DATABASE_ID"),
            api_base_url: String::from("https://api.notion.com/v1"),
            notion_version: String::from("2022-06-28"),
            retry_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: env_or_default("OPENAI_API_KEY"),
            api_base_url: String::from("https://api.openai.com/v1"),
            model: String::from("whisper-1"),
            language: Some(String::from("en")),
        }
    }
}

// Include tests
#[cfg(test)]
mod tests;

//! 错误类型定义

use thiserror::Error;

/// 配置错误，启动阶段即终止
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 缺少必需的凭据或标识
    #[error("{key} not found: set the {env} environment variable or `{key}` in the config file")]
    MissingCredential {
        key: &'static str,
        env: &'static str,
    },

    #[error("Unknown LLM provider: {0}")]
    UnknownProvider(String),
}

/// 流水线阶段错误，终止当次运行
#[derive(Error, Debug)]
pub enum StageError {
    /// 模型没有产生任何输出
    #[error("Agent result is undefined: stage `{stage}` produced no output")]
    EmptyOutput { stage: String },

    /// 结构化输出未通过schema校验
    #[error("Stage `{stage}` returned output that does not match its schema: {reason}")]
    InvalidStructuredOutput { stage: String, reason: String },

    /// 模型调用失败
    #[error("Stage `{stage}` model call failed: {source}")]
    Model {
        stage: String,
        #[source]
        source: anyhow::Error,
    },

    /// 模型调用超时
    #[error("Stage `{stage}` timed out after {seconds}s")]
    Timeout { stage: String, seconds: u64 },
}

/// 外部HTTP服务错误（Telegram / Notion / 语音转写）
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// 接口返回非成功状态
    #[error("{service} API error: {status} - {body}")]
    Api {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Unexpected {service} response: {detail}")]
    UnexpectedResponse {
        service: &'static str,
        detail: String,
    },
}

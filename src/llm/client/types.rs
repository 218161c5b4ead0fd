//! 模型调用的请求/响应类型

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// 推理强度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    #[default]
    Low,
    Medium,
    High,
}

impl std::fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReasoningEffort::Low => write!(f, "low"),
            ReasoningEffort::Medium => write!(f, "medium"),
            ReasoningEffort::High => write!(f, "high"),
        }
    }
}

/// 对话条目的角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// 对话条目内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ItemContent {
    Text(String),
    /// 结构化输出（例如信息提取阶段的JSON结果）
    Structured(serde_json::Value),
    /// 推理摘要，`id`/`signature` 需原样回传给同一Provider
    Reasoning {
        id: Option<String>,
        summary: Vec<String>,
        signature: Option<String>,
    },
    ToolCall {
        id: String,
        call_id: Option<String>,
        name: String,
        arguments: serde_json::Value,
    },
    ToolResult {
        id: String,
        call_id: Option<String>,
        output: String,
    },
}

impl ItemContent {
    /// 以文本形式呈现，结构化内容序列化为JSON
    pub fn as_text(&self) -> String {
        match self {
            ItemContent::Text(text) => text.clone(),
            ItemContent::Structured(value) => value.to_string(),
            ItemContent::Reasoning { summary, .. } => summary.join("\n"),
            ItemContent::ToolCall {
                name, arguments, ..
            } => format!("{}({})", name, arguments),
            ItemContent::ToolResult { output, .. } => output.clone(),
        }
    }
}

/// 对话历史中的一条记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub role: Role,
    pub content: ItemContent,
}

impl ConversationItem {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: ItemContent::Text(text.into()),
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: ItemContent::Text(text.into()),
        }
    }

    pub fn assistant_structured(value: serde_json::Value) -> Self {
        Self {
            role: Role::Assistant,
            content: ItemContent::Structured(value),
        }
    }
}

/// 单个阶段发给模型的请求
#[derive(Debug, Clone)]
pub struct StageRequest {
    /// 阶段名称，用于日志与错误信息
    pub stage: String,
    /// 渲染后的系统指令
    pub instructions: String,
    /// 截至本阶段的完整对话历史
    pub history: Vec<ConversationItem>,
    pub reasoning_effort: ReasoningEffort,
    /// 是否启用联网搜索工具
    pub web_search: bool,
    /// 要求结构化输出时附带的JSON Schema
    pub output_schema: Option<serde_json::Value>,
}

/// 模型返回的本阶段新增内容
#[derive(Debug, Clone, Default)]
pub struct StageResponse {
    /// 本次调用新生成的全部条目
    pub new_items: Vec<ConversationItem>,
    /// 最终回答文本，为空表示模型没有产出
    pub final_output: Option<String>,
}

/// 流水线各阶段调用模型的接口
#[async_trait]
pub trait StageModel: Send + Sync {
    async fn complete(&self, request: StageRequest) -> Result<StageResponse>;
}

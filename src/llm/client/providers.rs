//! LLM Provider支持模块

use anyhow::Result;
use rig::{
    agent::{Agent, AgentBuilder},
    client::CompletionClient,
    completion::{CompletionModel, Message, Prompt, PromptError},
};
use serde_json::json;

use crate::config::{LLMConfig, LLMProvider};
use crate::llm::client::types::ReasoningEffort;
use crate::llm::client::utils::strict_json_schema;

/// 单次调用的模型参数
#[derive(Debug, Clone, Copy)]
pub struct ModelSettings<'a> {
    pub reasoning_effort: ReasoningEffort,
    pub web_search: bool,
    /// 结构化输出的JSON Schema
    pub output_schema: Option<&'a serde_json::Value>,
}

/// 统一的Provider客户端枚举
#[derive(Clone)]
pub enum ProviderClient {
    OpenAI(rig::providers::openai::Client),
    OpenRouter(rig::providers::openrouter::Client),
    Anthropic(rig::providers::anthropic::Client),
    DeepSeek(rig::providers::deepseek::Client),
    Ollama(rig::providers::ollama::Client),
}

impl ProviderClient {
    /// 根据配置创建相应的provider客户端
    pub fn new(config: &LLMConfig) -> Result<Self> {
        match config.provider {
            LLMProvider::OpenAI => {
                let client = rig::providers::openai::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::OpenAI(client))
            }
            LLMProvider::OpenRouter => {
                let client = rig::providers::openrouter::Client::builder(&config.api_key).build();
                Ok(ProviderClient::OpenRouter(client))
            }
            LLMProvider::Anthropic => {
                let client =
                    rig::providers::anthropic::ClientBuilder::new(&config.api_key).build()?;
                Ok(ProviderClient::Anthropic(client))
            }
            LLMProvider::DeepSeek => {
                let client = rig::providers::deepseek::Client::builder(&config.api_key)
                    .base_url(&config.api_base_url)
                    .build();
                Ok(ProviderClient::DeepSeek(client))
            }
            LLMProvider::Ollama => {
                let client = rig::providers::ollama::Client::builder().build();
                Ok(ProviderClient::Ollama(client))
            }
        }
    }

    /// 联网搜索只有OpenAI Responses接口原生支持
    pub fn supports_web_search(&self) -> bool {
        matches!(self, ProviderClient::OpenAI(_))
    }

    /// 创建Agent
    pub fn create_agent(
        &self,
        model: &str,
        system_prompt: &str,
        config: &LLMConfig,
        settings: &ModelSettings<'_>,
    ) -> ProviderAgent {
        match self {
            ProviderClient::OpenAI(client) => {
                // agent() 走 Responses 接口，推理强度/store/web_search 通过附加参数下发
                let agent = configure(client.agent(model), system_prompt, config)
                    .additional_params(openai_additional_params(config, settings))
                    .build();
                ProviderAgent::OpenAI(agent)
            }
            ProviderClient::OpenRouter(client) => {
                let agent = configure(client.agent(model), system_prompt, config)
                    .additional_params(json!({ "reasoning": { "effort": settings.reasoning_effort.to_string() } }))
                    .build();
                ProviderAgent::OpenRouter(agent)
            }
            ProviderClient::Anthropic(client) => {
                let agent = configure(client.agent(model), system_prompt, config).build();
                ProviderAgent::Anthropic(agent)
            }
            ProviderClient::DeepSeek(client) => {
                let agent = configure(client.agent(model), system_prompt, config).build();
                ProviderAgent::DeepSeek(agent)
            }
            ProviderClient::Ollama(client) => {
                let mut builder = configure(client.agent(model), system_prompt, config);
                if settings.output_schema.is_some() {
                    builder = builder.additional_params(json!({ "format": "json" }));
                }
                ProviderAgent::Ollama(builder.build())
            }
        }
    }
}

fn configure<M>(builder: AgentBuilder<M>, system_prompt: &str, config: &LLMConfig) -> AgentBuilder<M>
where
    M: CompletionModel,
{
    let builder = builder
        .preamble(system_prompt)
        .max_tokens(config.max_tokens.into());
    match config.temperature {
        Some(temperature) => builder.temperature(temperature),
        None => builder,
    }
}

/// OpenAI Responses接口的附加参数
pub fn openai_additional_params(config: &LLMConfig, settings: &ModelSettings<'_>) -> serde_json::Value {
    let mut params = json!({
        "reasoning": { "effort": settings.reasoning_effort.to_string() },
        "store": config.store,
    });
    if settings.web_search {
        params["tools"] = json!([{ "type": "web_search" }]);
    }
    // 服务端按schema约束生成，本地严格解析仍是最后一道校验
    if let Some(schema) = settings.output_schema {
        params["text"] = json!({
            "format": {
                "type": "json_schema",
                "name": "stage_output",
                "strict": true,
                "schema": strict_json_schema(schema),
            }
        });
    }
    params
}

/// 统一的Agent枚举
pub enum ProviderAgent {
    OpenAI(Agent<rig::providers::openai::responses_api::ResponsesCompletionModel>),
    OpenRouter(Agent<rig::providers::openrouter::CompletionModel>),
    Anthropic(Agent<rig::providers::anthropic::completion::CompletionModel>),
    DeepSeek(Agent<rig::providers::deepseek::CompletionModel>),
    Ollama(Agent<rig::providers::ollama::CompletionModel<reqwest::Client>>),
}

impl ProviderAgent {
    /// 携带对话历史执行一轮对话
    ///
    /// rig会把prompt以及本轮生成的全部消息（推理、工具调用、最终回答）追加到 `history` 末尾。
    pub async fn prompt_with_history(
        &self,
        prompt: Message,
        history: &mut Vec<Message>,
    ) -> Result<String, PromptError> {
        match self {
            ProviderAgent::OpenAI(agent) => agent.prompt(prompt).with_history(history).await,
            ProviderAgent::OpenRouter(agent) => agent.prompt(prompt).with_history(history).await,
            ProviderAgent::Anthropic(agent) => agent.prompt(prompt).with_history(history).await,
            ProviderAgent::DeepSeek(agent) => agent.prompt(prompt).with_history(history).await,
            ProviderAgent::Ollama(agent) => agent.prompt(prompt).with_history(history).await,
        }
    }
}

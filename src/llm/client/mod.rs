//! LLM客户端 - 提供统一的LLM服务接口

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{Config, LLMProvider};
use crate::error::StageError;
use crate::llm::client::utils::{
    evaluate_befitting_model, instructions_with_schema, items_from_messages, split_history,
};

mod providers;
pub mod types;
pub mod utils;

use providers::{ModelSettings, ProviderClient};
use types::{ConversationItem, ItemContent, StageModel, StageRequest, StageResponse};

/// LLM客户端 - 提供统一的LLM服务接口
#[derive(Clone)]
pub struct LLMClient {
    config: Config,
    client: ProviderClient,
}

impl LLMClient {
    /// 创建新的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let client = ProviderClient::new(&config.llm)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl StageModel for LLMClient {
    async fn complete(&self, request: StageRequest) -> Result<StageResponse> {
        let llm_config = &self.config.llm;
        let model = evaluate_befitting_model(llm_config, request.reasoning_effort);
        let preamble = instructions_with_schema(&request.instructions, request.output_schema.as_ref());

        let web_search = request.web_search && self.client.supports_web_search();
        if request.web_search && !web_search {
            info!(
                stage = %request.stage,
                provider = %llm_config.provider,
                "provider has no native web search tool, answering from model knowledge"
            );
        }

        let settings = ModelSettings {
            reasoning_effort: request.reasoning_effort,
            web_search,
            output_schema: request.output_schema.as_ref(),
        };
        let agent = self
            .client
            .create_agent(&model, &preamble, llm_config, &settings);

        let (prompt, mut messages) = split_history(&request.history)
            .ok_or_else(|| anyhow!("stage `{}` called with an empty history", request.stage))?;

        debug!(
            stage = %request.stage,
            model = %model,
            effort = %request.reasoning_effort,
            history_len = request.history.len(),
            "calling model"
        );

        // rig先追加prompt，其后才是本轮生成的消息
        let generated_from = messages.len() + 1;

        // 超时由模型调用层负责，编排层不再额外设置
        let started = Instant::now();
        let timeout = Duration::from_secs(llm_config.timeout_seconds);
        let output = tokio::time::timeout(timeout, agent.prompt_with_history(prompt, &mut messages))
            .await
            .map_err(|_| StageError::Timeout {
                stage: request.stage.clone(),
                seconds: llm_config.timeout_seconds,
            })??;

        debug!(
            stage = %request.stage,
            elapsed_ms = started.elapsed().as_millis() as u64,
            output_len = output.len(),
            "model call finished"
        );

        if output.trim().is_empty() {
            return Ok(StageResponse::default());
        }

        let generated = messages.get(generated_from..).unwrap_or_default();
        let mut new_items = items_from_messages(generated, request.output_schema.is_some());
        // 未保存在服务端的OpenAI推理条目无法按id回放
        if llm_config.provider == LLMProvider::OpenAI && !llm_config.store {
            new_items.retain(|item| !matches!(item.content, ItemContent::Reasoning { .. }));
        }
        if new_items.is_empty() {
            new_items.push(ConversationItem::assistant_text(output.clone()));
        }
        debug!(stage = %request.stage, new_items = new_items.len(), "collected generated items");

        Ok(StageResponse {
            new_items,
            final_output: Some(output),
        })
    }
}

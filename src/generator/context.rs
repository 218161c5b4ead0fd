use std::sync::Arc;

use anyhow::Result;

use crate::{
    config::Config,
    llm::client::{LLMClient, types::StageModel},
};

/// 单次流水线运行共享的只读上下文
#[derive(Clone)]
pub struct PipelineContext {
    /// 模型调用器，用于与AI通信。
    pub model: Arc<dyn StageModel>,
    /// 配置
    pub config: Config,
}

impl PipelineContext {
    /// 根据配置创建真实的LLM客户端
    pub fn new(config: Config) -> Result<Self> {
        let llm_client = LLMClient::new(config.clone())?;
        Ok(Self::with_model(config, Arc::new(llm_client)))
    }

    /// 使用指定的模型实现（测试中替换为脚本化模型）
    pub fn with_model(config: Config, model: Arc<dyn StageModel>) -> Self {
        Self { model, config }
    }
}

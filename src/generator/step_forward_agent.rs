use anyhow::Result;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::error::StageError;
use crate::generator::context::PipelineContext;
use crate::generator::intake::history::ConversationHistory;
use crate::generator::intake::types::AgentType;
use crate::llm::client::types::{ConversationItem, ReasoningEffort, StageRequest};
use crate::llm::client::utils::strip_code_fence;

/// LLM调用方式配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LLMCallMode {
    /// 返回符合Output schema的结构化数据
    Extract,
    /// 返回自由文本
    Prompt,
    /// 返回自由文本，并开放联网搜索工具
    PromptWithWebSearch,
}

/// Prompt模板配置
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// 系统提示词，可以包含 `{placeholder}` 形式的上下文占位符
    pub system_prompt: String,
    /// LLM调用方式
    pub llm_call_mode: LLMCallMode,
    /// 推理强度
    pub reasoning_effort: ReasoningEffort,
}

/// 单个阶段的执行结果：解析后的输出以及本阶段新增的对话条目
#[derive(Debug, Clone)]
pub struct StageOutcome<T> {
    pub output: T,
    pub new_items: Vec<ConversationItem>,
}

/// 极简Agent trait：一个阶段只需声明模板和上下文注入方式
#[async_trait]
pub trait StepForwardAgent: Send + Sync {
    /// Agent的输出类型 - 必须支持JSON序列化
    type Output: JsonSchema + DeserializeOwned + Serialize + Send + Sync + 'static;

    /// 编排器在调用前注入的上下文
    type StageContext: Send + Sync;

    /// Agent类型标识
    fn agent_type(&self) -> AgentType;

    /// Prompt模板配置
    fn prompt_template(&self) -> PromptTemplate;

    /// 把注入的上下文渲染进系统提示词
    fn render_instructions(
        &self,
        template: &PromptTemplate,
        _stage_context: &Self::StageContext,
    ) -> String {
        template.system_prompt.clone()
    }

    /// 可选的后处理钩子
    fn post_process(&self, _result: &Self::Output, _context: &PipelineContext) -> Result<()> {
        Ok(())
    }

    /// 默认实现的execute方法：以完整历史调用模型，空输出或不合法输出都是致命错误
    async fn execute(
        &self,
        context: &PipelineContext,
        history: &ConversationHistory,
        stage_context: &Self::StageContext,
    ) -> Result<StageOutcome<Self::Output>, StageError> {
        let stage = self.agent_type().to_string();
        let template = self.prompt_template();
        let instructions = self.render_instructions(&template, stage_context);

        let output_schema = match template.llm_call_mode {
            LLMCallMode::Extract => {
                let schema = schemars::schema_for!(Self::Output);
                Some(serde_json::to_value(schema).map_err(|e| {
                    StageError::InvalidStructuredOutput {
                        stage: stage.clone(),
                        reason: format!("schema could not be rendered: {}", e),
                    }
                })?)
            }
            LLMCallMode::Prompt | LLMCallMode::PromptWithWebSearch => None,
        };

        let request = StageRequest {
            stage: stage.clone(),
            instructions,
            history: history.items().to_vec(),
            reasoning_effort: template.reasoning_effort,
            web_search: template.llm_call_mode == LLMCallMode::PromptWithWebSearch,
            output_schema,
        };

        let response = context
            .model
            .complete(request)
            .await
            .map_err(|e| into_stage_error(&stage, e))?;

        let raw = match response.final_output {
            Some(raw) if !raw.trim().is_empty() => raw,
            _ => return Err(StageError::EmptyOutput { stage }),
        };

        let output: Self::Output = match template.llm_call_mode {
            LLMCallMode::Extract => serde_json::from_str(strip_code_fence(&raw)),
            LLMCallMode::Prompt | LLMCallMode::PromptWithWebSearch => {
                serde_json::from_value(serde_json::Value::String(raw))
            }
        }
        .map_err(|e| StageError::InvalidStructuredOutput {
            stage: stage.clone(),
            reason: e.to_string(),
        })?;

        if response.new_items.is_empty() {
            warn!(stage = %stage, "model returned output without any conversation items");
        }

        self.post_process(&output, context)
            .map_err(|e| into_stage_error(&stage, e))?;

        Ok(StageOutcome {
            output,
            new_items: response.new_items,
        })
    }
}

/// 已经是阶段错误的保持原样，其余归为模型调用失败
fn into_stage_error(stage: &str, error: anyhow::Error) -> StageError {
    match error.downcast::<StageError>() {
        Ok(stage_error) => stage_error,
        Err(source) => StageError::Model {
            stage: stage.to_string(),
            source,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_errors_pass_through() {
        let original = anyhow::Error::new(StageError::Timeout {
            stage: "Search Prompt".to_string(),
            seconds: 5,
        });
        let converted = into_stage_error("other", original);
        assert!(matches!(
            converted,
            StageError::Timeout { ref stage, seconds: 5 } if stage == "Search Prompt"
        ));
    }

    #[test]
    fn test_other_errors_become_model_errors() {
        let converted = into_stage_error("Web search with prompt", anyhow::anyhow!("503"));
        match converted {
            StageError::Model { stage, source } => {
                assert_eq!(stage, "Web search with prompt");
                assert_eq!(source.to_string(), "503");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

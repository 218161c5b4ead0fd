use crate::generator::intake::types::{AgentType, SearchPromptContext};
use crate::generator::step_forward_agent::{LLMCallMode, PromptTemplate, StepForwardAgent};
use crate::llm::client::types::ReasoningEffort;

/// 调研提示词撰写员 - 围绕调研焦点生成联网调研提示词
#[derive(Default)]
pub struct SearchPromptWriter;

impl StepForwardAgent for SearchPromptWriter {
    type Output = String;
    type StageContext = SearchPromptContext;

    fn agent_type(&self) -> AgentType {
        AgentType::SearchPromptWriter
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: include_str!("prompts/search_prompt_writer_sys.tpl").to_string(),
            llm_call_mode: LLMCallMode::Prompt,
            reasoning_effort: ReasoningEffort::Medium,
        }
    }

    fn render_instructions(
        &self,
        template: &PromptTemplate,
        stage_context: &SearchPromptContext,
    ) -> String {
        template
            .system_prompt
            .replace("{input_result}", &stage_context.input_result)
    }
}

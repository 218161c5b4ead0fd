use crate::generator::intake::types::{AgentType, WebSearchContext};
use crate::generator::step_forward_agent::{LLMCallMode, PromptTemplate, StepForwardAgent};
use crate::llm::client::types::ReasoningEffort;

/// 联网调研员 - 按上一阶段的提示词联网搜索解决方案
#[derive(Default)]
pub struct WebResearcher;

impl StepForwardAgent for WebResearcher {
    type Output = String;
    type StageContext = WebSearchContext;

    fn agent_type(&self) -> AgentType {
        AgentType::WebResearcher
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: include_str!("prompts/web_researcher_sys.tpl").to_string(),
            llm_call_mode: LLMCallMode::PromptWithWebSearch,
            reasoning_effort: ReasoningEffort::Low,
        }
    }

    fn render_instructions(&self, template: &PromptTemplate, stage_context: &WebSearchContext) -> String {
        template
            .system_prompt
            .replace("{input_output_text}", &stage_context.input_output_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_prompt_is_embedded() {
        let agent = WebResearcher;
        let template = agent.prompt_template();
        let rendered = agent.render_instructions(
            &template,
            &WebSearchContext {
                input_output_text: "Find AI helpdesk tools for a 5-person team".to_string(),
            },
        );

        assert!(rendered.contains("Find AI helpdesk tools for a 5-person team"));
        assert!(!rendered.contains("{input_output_text}"));
        assert_eq!(template.llm_call_mode, LLMCallMode::PromptWithWebSearch);
    }
}

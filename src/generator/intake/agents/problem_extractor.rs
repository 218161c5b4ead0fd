use anyhow::Result;
use tracing::{debug, warn};

use crate::generator::context::PipelineContext;
use crate::generator::intake::types::{AgentType, ExtractionRecord};
use crate::generator::step_forward_agent::{LLMCallMode, PromptTemplate, StepForwardAgent};
use crate::llm::client::types::ReasoningEffort;

/// 问题提取员 - 从对话中提取联系人信息和完整的问题清单
#[derive(Default)]
pub struct ProblemExtractor;

impl StepForwardAgent for ProblemExtractor {
    type Output = ExtractionRecord;
    type StageContext = ();

    fn agent_type(&self) -> AgentType {
        AgentType::ProblemExtractor
    }

    fn prompt_template(&self) -> PromptTemplate {
        PromptTemplate {
            system_prompt: include_str!("prompts/problem_extractor_sys.tpl").to_string(),
            llm_call_mode: LLMCallMode::Extract,
            reasoning_effort: ReasoningEffort::Low,
        }
    }

    fn post_process(&self, result: &ExtractionRecord, _context: &PipelineContext) -> Result<()> {
        for warning in result.score_warnings() {
            warn!(stage = %self.agent_type(), "score out of range: {}", warning);
        }
        debug!(
            problems = result.problems.len(),
            research_items = result.research_items().len(),
            "extraction parsed"
        );
        Ok(())
    }
}

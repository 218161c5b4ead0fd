use std::time::Instant;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::StageError;
use crate::generator::context::PipelineContext;
use crate::generator::intake::agents::problem_extractor::ProblemExtractor;
use crate::generator::intake::agents::search_prompt_writer::SearchPromptWriter;
use crate::generator::intake::agents::web_researcher::WebResearcher;
use crate::generator::intake::history::ConversationHistory;
use crate::generator::intake::observer::{NoopObserver, PipelineObserver};
use crate::generator::intake::types::{
    PipelineResult, SearchPromptContext, WebSearchContext, WorkflowInput,
};
use crate::generator::step_forward_agent::StepForwardAgent;

/// 一次完整运行的产物：组合结果以及最终的对话历史
#[derive(Debug, Clone)]
pub struct IntakeRun {
    pub result: PipelineResult,
    pub history: ConversationHistory,
}

/// 三阶段编排器：提取 -> 调研提示词 -> 联网调研
///
/// 各阶段严格串行，每个阶段都能看到此前的完整历史。
/// 任意阶段失败即终止本次运行，不返回部分结果，也不重试。
#[derive(Default)]
pub struct IntakeOrchestrator;

impl IntakeOrchestrator {
    /// 执行流水线，只返回组合结果
    pub async fn run(
        &self,
        context: &PipelineContext,
        input: &WorkflowInput,
    ) -> Result<PipelineResult, StageError> {
        let run = self.execute(context, input, &NoopObserver).await?;
        Ok(run.result)
    }

    /// 执行流水线并在各阶段边界回调观察者
    pub async fn execute(
        &self,
        context: &PipelineContext,
        input: &WorkflowInput,
        observer: &dyn PipelineObserver,
    ) -> Result<IntakeRun, StageError> {
        // 并发运行时用于区分日志
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            %run_id,
            input_chars = input.input_as_text.chars().count(),
            "starting intake pipeline"
        );

        let history = ConversationHistory::seeded(&input.input_as_text);

        let (extraction, history) = self
            .execute_agent(&ProblemExtractor, context, history, &(), observer)
            .await?;
        observer.on_extraction(&extraction).await;

        let focus = extraction.focus_item();
        info!(%run_id, focus = %focus, "research focus selected");

        let (search_prompt, history) = self
            .execute_agent(
                &SearchPromptWriter,
                context,
                history,
                &SearchPromptContext {
                    input_result: focus,
                },
                observer,
            )
            .await?;

        let (web_search_results, history) = self
            .execute_agent(
                &WebResearcher,
                context,
                history,
                &WebSearchContext {
                    input_output_text: search_prompt.clone(),
                },
                observer,
            )
            .await?;

        info!(
            %run_id,
            elapsed_s = started.elapsed().as_secs_f64(),
            history_len = history.len(),
            problems = extraction.problems.len(),
            "intake pipeline finished"
        );

        Ok(IntakeRun {
            result: PipelineResult::assemble(extraction, search_prompt, web_search_results),
            history,
        })
    }

    /// 执行单个阶段，并把新增条目追加到历史末尾
    async fn execute_agent<T>(
        &self,
        agent: &T,
        context: &PipelineContext,
        history: ConversationHistory,
        stage_context: &T::StageContext,
        observer: &dyn PipelineObserver,
    ) -> Result<(T::Output, ConversationHistory), StageError>
    where
        T: StepForwardAgent,
    {
        let agent_type = agent.agent_type();
        observer.on_stage_started(agent_type).await;
        info!(step = agent_type.step(), stage = %agent_type, "running stage");

        let started = Instant::now();
        let outcome = agent
            .execute(context, &history, stage_context)
            .await
            .inspect_err(|e| error!(stage = %agent_type, "stage failed: {}", e))?;
        let elapsed = started.elapsed();

        info!(
            stage = %agent_type,
            new_items = outcome.new_items.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "stage completed"
        );
        observer.on_stage_completed(agent_type, elapsed).await;

        Ok((outcome.output, history.extended(outcome.new_items)))
    }
}

//! 对话接入流水线
//!
//! 问题提取 -> 调研提示词 -> 联网调研，三个阶段共享一段只追加的对话历史。

pub mod agents;
pub mod history;
pub mod observer;
pub mod orchestrator;
pub mod types;

use crate::error::StageError;
use crate::generator::context::PipelineContext;
use crate::generator::intake::orchestrator::IntakeOrchestrator;
use crate::generator::intake::types::{PipelineResult, WorkflowInput};

/// 对一段对话文本执行完整流水线
pub async fn run_workflow(
    context: &PipelineContext,
    input_as_text: &str,
) -> Result<PipelineResult, StageError> {
    let input = WorkflowInput {
        input_as_text: input_as_text.to_string(),
    };
    IntakeOrchestrator.run(context, &input).await
}

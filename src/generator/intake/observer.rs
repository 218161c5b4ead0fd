//! 流水线进度观察者

use async_trait::async_trait;
use std::time::Duration;

use crate::generator::intake::types::{AgentType, ExtractionRecord};

/// 阶段进度回调，默认全部为空实现
#[async_trait]
pub trait PipelineObserver: Send + Sync {
    async fn on_stage_started(&self, _agent_type: AgentType) {}

    /// 第一阶段完成后立即回调，便于提前展示问题清单
    async fn on_extraction(&self, _record: &ExtractionRecord) {}

    async fn on_stage_completed(&self, _agent_type: AgentType, _elapsed: Duration) {}
}

/// 不做任何事的观察者
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// 在终端打印阶段进度
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver;

#[async_trait]
impl PipelineObserver for ConsoleObserver {
    async fn on_stage_started(&self, agent_type: AgentType) {
        println!(
            "🤖 [{}/{}] {}...",
            agent_type.step(),
            AgentType::TOTAL_STEPS,
            agent_type
        );
    }

    async fn on_extraction(&self, record: &ExtractionRecord) {
        println!("   📋 {} problem(s) identified", record.problems.len());
        for (i, problem) in record.problems.iter().take(5).enumerate() {
            println!("      {}. {}", i + 1, problem);
        }
    }

    async fn on_stage_completed(&self, agent_type: AgentType, elapsed: Duration) {
        println!("✓ {} ({:.1}s)", agent_type, elapsed.as_secs_f64());
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// 提取结果为空时使用的调研焦点
pub const FALLBACK_FOCUS: &str = "General business consultation";

/// 评分的约定区间（仅用于提示，不做截断）
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 1..=10;

/// 智能体类型枚举
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentType {
    ProblemExtractor,
    SearchPromptWriter,
    WebResearcher,
}

impl AgentType {
    /// 流水线中的步骤序号（从1开始）
    pub fn step(&self) -> usize {
        match self {
            AgentType::ProblemExtractor => 1,
            AgentType::SearchPromptWriter => 2,
            AgentType::WebResearcher => 3,
        }
    }

    pub const TOTAL_STEPS: usize = 3;
}

impl Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let str = match self {
            AgentType::ProblemExtractor => "identify problems & extract details",
            AgentType::SearchPromptWriter => "Search Prompt",
            AgentType::WebResearcher => "Web search with prompt",
        };
        write!(f, "{}", str)
    }
}

/// 流水线入口参数
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub input_as_text: String,
}

/// 输入来源，写入Notion的Source字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputSource {
    Voice,
    Text,
}

impl Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Voice => write!(f, "voice"),
            InputSource::Text => write!(f, "text"),
        }
    }
}

/// 联系人所在平台
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContactPlatform {
    Whatsapp,
    Telegram,
    Discord,
}

impl Display for ContactPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactPlatform::Whatsapp => write!(f, "whatsapp"),
            ContactPlatform::Telegram => write!(f, "telegram"),
            ContactPlatform::Discord => write!(f, "discord"),
        }
    }
}

/// 约束条件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Constraints {
    pub budget: Option<String>,
    pub deadline: Option<String>,
    pub team_size: Option<String>,
    pub stack: Option<String>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        self.budget.is_none()
            && self.deadline.is_none()
            && self.team_size.is_none()
            && self.stack.is_none()
    }
}

/// 优先级条目，impact/effort 按 1-10 打分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Priority {
    pub impact: i64,
    pub effort: i64,
    pub summary: String,
}

/// 候选解决方案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResearchItem {
    pub title: String,
    pub url: String,
    pub why_relevant: String,
    pub effort: i64,
    pub impact: i64,
}

/// 第一阶段的结构化提取结果。
///
/// 除 `problems` 外全部可缺省；未知字段直接拒绝。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractionRecord {
    pub contact_name: Option<String>,
    pub contact_handle: Option<String>,
    pub contact_platform: Option<ContactPlatform>,
    pub company: Option<String>,
    /// 对话中出现的全部问题、痛点、障碍与需求，每条单独成项
    pub problems: Vec<String>,
    pub constraints: Option<Constraints>,
    pub priorities: Option<Vec<Priority>>,
    pub research_items: Option<Vec<ResearchItem>>,
    /// 在其余字段确定后生成的总结
    pub report_markdown: Option<String>,
}

impl ExtractionRecord {
    /// 只有问题列表的记录
    pub fn with_problems(problems: Vec<String>) -> Self {
        Self {
            contact_name: None,
            contact_handle: None,
            contact_platform: None,
            company: None,
            problems,
            constraints: None,
            priorities: None,
            research_items: None,
            report_markdown: None,
        }
    }

    pub fn priorities(&self) -> &[Priority] {
        self.priorities.as_deref().unwrap_or_default()
    }

    pub fn research_items(&self) -> &[ResearchItem] {
        self.research_items.as_deref().unwrap_or_default()
    }

    /// 计算调研焦点：首个候选方案 > 首个问题 > 兜底文案
    pub fn focus_item(&self) -> String {
        if let Some(item) = self.research_items().first() {
            return format!("{} - {}", item.title, item.why_relevant);
        }
        self.problems
            .first()
            .filter(|problem| !problem.is_empty())
            .cloned()
            .unwrap_or_else(|| FALLBACK_FOCUS.to_string())
    }

    /// 列出超出 1-10 约定区间的评分
    pub fn score_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let mut check = |label: String, field: &str, value: i64| {
            if !SCORE_RANGE.contains(&value) {
                warnings.push(format!("{} {} = {} is outside 1-10", label, field, value));
            }
        };

        for (i, priority) in self.priorities().iter().enumerate() {
            check(format!("priorities[{}]", i), "impact", priority.impact);
            check(format!("priorities[{}]", i), "effort", priority.effort);
        }
        for (i, item) in self.research_items().iter().enumerate() {
            check(format!("research_items[{}]", i), "impact", item.impact);
            check(format!("research_items[{}]", i), "effort", item.effort);
        }
        warnings
    }
}

/// 供下游消费的完整报告视图，字段与 ExtractionRecord 一一对应
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub contact_name: Option<String>,
    pub contact_handle: Option<String>,
    pub contact_platform: Option<ContactPlatform>,
    pub company: Option<String>,
    pub problems: Vec<String>,
    pub constraints: Option<Constraints>,
    pub priorities: Option<Vec<Priority>>,
    pub research_items: Option<Vec<ResearchItem>>,
    pub report_markdown: Option<String>,
}

impl From<&ExtractionRecord> for FullReport {
    fn from(record: &ExtractionRecord) -> Self {
        Self {
            contact_name: record.contact_name.clone(),
            contact_handle: record.contact_handle.clone(),
            contact_platform: record.contact_platform,
            company: record.company.clone(),
            problems: record.problems.clone(),
            constraints: record.constraints.clone(),
            priorities: record.priorities.clone(),
            research_items: record.research_items.clone(),
            report_markdown: record.report_markdown.clone(),
        }
    }
}

impl FullReport {
    pub fn priorities(&self) -> &[Priority] {
        self.priorities.as_deref().unwrap_or_default()
    }

    pub fn research_items(&self) -> &[ResearchItem] {
        self.research_items.as_deref().unwrap_or_default()
    }
}

/// 三个阶段的最终组合结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub contact_details: ExtractionRecord,
    pub search_prompt: String,
    pub web_search_results: String,
    pub full_report: FullReport,
}

impl PipelineResult {
    pub fn assemble(
        contact_details: ExtractionRecord,
        search_prompt: String,
        web_search_results: String,
    ) -> Self {
        let full_report = FullReport::from(&contact_details);
        Self {
            contact_details,
            search_prompt,
            web_search_results,
            full_report,
        }
    }
}

/// 调研提示词阶段的注入上下文
#[derive(Debug, Clone, PartialEq)]
pub struct SearchPromptContext {
    pub input_result: String,
}

/// 联网调研阶段的注入上下文
#[derive(Debug, Clone, PartialEq)]
pub struct WebSearchContext {
    pub input_output_text: String,
}

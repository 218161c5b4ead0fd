//! MarkdownV2 消息排版

use chrono::{DateTime, Utc};

use crate::generator::intake::types::PipelineResult;

/// MarkdownV2 中需要转义的字符
const SPECIAL_CHARS: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

const TRUNCATION_SUFFIX: &str = "\n\\.\\.\\.";

/// 会在截断时需要补齐的实体标记
const ENTITY_MARKERS: &[char] = &['*', '_', '~', '`'];

pub const START_TEXT: &str = "👋 *Welcome to VoiceFast Agent\\!*\n\n🎤 Send me a voice message and I'll:\n1\\. Transcribe your audio\n2\\. Extract contact information and problems\n3\\. Generate research insights\n4\\. Send you a detailed report\n\n📝 You can also send text messages to analyze\\.\n\n💡 Commands:\n/start \\- Show this message\n/help \\- Get help\n/status \\- Check bot status";

pub const HELP_TEXT: &str = "📚 *VoiceFast Agent Help*\n\n*How to use:*\n• Send a voice message describing a business conversation\n• Or send a text message with the same\n\n*What I extract:*\n• Contact name, handle, platform, company\n• Problems and pain points\n• Constraints \\(budget, deadline, team size, tech stack\\)\n• Research insights and solutions\n\n*Output:*\n• Structured analysis\n• Prioritized problems\n• Actionable research items\n\nJust send a voice note to get started\\!";

pub const STATUS_TEXT: &str = "✅ *Bot Status: Online*\n\n🤖 Agent: Ready\n🎤 Transcription: Configured\n💾 Storage: Available\n\nSend a voice message to test\\!";

pub const VOICE_RECEIVED_TEXT: &str = "🎤 Received your voice message\\! Processing\\.\\.\\.\n\n⏳ Transcribing audio\\.\\.\\.";

pub const TEXT_RECEIVED_TEXT: &str = "📝 Processing your message\\.\\.\\.\n\n🤖 Running AI agent analysis\\.\\.\\.";

/// 反斜杠转义所有MarkdownV2特殊字符
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL_CHARS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// 把消息限制在 `max_chars` 个字符以内
///
/// 优先在换行处截断；不会留下悬空的转义符，截断处仍未闭合的 `*` `_` `~` `` ` `` 实体会被补齐。
pub fn fit_message(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    // 为闭合标记预留位置
    let keep = max_chars.saturating_sub(TRUNCATION_SUFFIX.chars().count() + ENTITY_MARKERS.len());
    let mut truncated: String = text.chars().take(keep).collect();

    if let Some(pos) = truncated.rfind('\n')
        && pos >= truncated.len() / 2
    {
        truncated.truncate(pos);
    }

    let trailing_backslashes = truncated.chars().rev().take_while(|c| *c == '\\').count();
    if trailing_backslashes % 2 == 1 {
        truncated.pop();
    }

    let mut open = open_entities(&truncated);
    // 刚打开就被截断的实体直接去掉，避免产生空实体
    while let Some(&marker) = open.last()
        && truncated.ends_with(marker)
        && !is_escaped_tail(&truncated)
    {
        truncated.pop();
        open.pop();
    }

    truncated.extend(open.iter().rev());
    truncated.push_str(TRUNCATION_SUFFIX);
    truncated
}

/// 按打开顺序返回尚未闭合的实体标记
fn open_entities(text: &str) -> Vec<char> {
    let mut open: Vec<char> = Vec::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
            continue;
        }
        if !ENTITY_MARKERS.contains(&c) {
            continue;
        }
        match open.iter().rposition(|m| *m == c) {
            Some(index) => {
                open.remove(index);
            }
            None => open.push(c),
        }
    }
    open
}

/// 最后一个字符前是否有奇数个反斜杠
fn is_escaped_tail(text: &str) -> bool {
    text.chars().rev().skip(1).take_while(|c| *c == '\\').count() % 2 == 1
}

/// 结果报告：联系人、问题（前5个）、约束、候选方案（前3个）
pub fn format_pipeline_report(result: &PipelineResult, now: DateTime<Utc>, max_chars: usize) -> String {
    let report = &result.full_report;
    let mut message = String::from("🤖 *VoiceFast Agent Report*\n\n");
    message.push_str(&format!(
        "📅 *Generated:* {}\n\n",
        escape_markdown_v2(&now.format("%Y-%m-%d %H:%M:%S UTC").to_string())
    ));

    message.push_str("👤 *Contact Information*\n");
    message.push_str(&format!(
        "• Name: {}\n",
        escape_markdown_v2(report.contact_name.as_deref().unwrap_or("Unknown"))
    ));
    message.push_str(&format!(
        "• Company: {}\n",
        escape_markdown_v2(report.company.as_deref().unwrap_or("Not specified"))
    ));
    if let Some(handle) = &report.contact_handle {
        message.push_str(&format!("• Handle: {}\n", escape_markdown_v2(handle)));
    }
    if let Some(platform) = report.contact_platform {
        message.push_str(&format!(
            "• Platform: {}\n",
            escape_markdown_v2(&platform.to_string())
        ));
    }
    message.push('\n');

    message.push_str(&format!(
        "🚨 *Problems Identified* \\({}\\)\n",
        report.problems.len()
    ));
    message.push_str(&numbered_problems(&report.problems, 5));
    message.push('\n');

    if let Some(constraints) = report.constraints.as_ref().filter(|c| !c.is_empty()) {
        message.push_str("📋 *Constraints*\n");
        let fields = [
            ("Budget", &constraints.budget),
            ("Deadline", &constraints.deadline),
            ("Team Size", &constraints.team_size),
            ("Stack", &constraints.stack),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                message.push_str(&format!("• {}: {}\n", label, escape_markdown_v2(value)));
            }
        }
        message.push('\n');
    }

    let research_items = report.research_items();
    if !research_items.is_empty() {
        message.push_str("🔍 *Research Items*\n");
        for (i, item) in research_items.iter().take(3).enumerate() {
            message.push_str(&format!("{}\\. *{}*\n", i + 1, escape_markdown_v2(&item.title)));
            message.push_str(&format!("   {}\n", escape_markdown_v2(&item.url)));
            message.push_str(&format!(
                "   Impact: {}/10 \\| Effort: {}/10\n",
                escape_markdown_v2(&item.impact.to_string()),
                escape_markdown_v2(&item.effort.to_string())
            ));
        }
        if research_items.len() > 3 {
            message.push_str(&format!("_\\.\\.\\.and {} more_\n", research_items.len() - 3));
        }
    }

    message.push_str("\n✨ _Full report saved to output directory_");
    fit_message(&message, max_chars)
}

/// 第一阶段结束后的问题预览，没有问题时返回 None
pub fn format_problem_preview(problems: &[String]) -> Option<String> {
    if problems.is_empty() {
        return None;
    }
    Some(format!(
        "✅ *Problems Identified:* {}\n\n{}\n🔎 Moving to research phase\\.\\.\\.",
        problems.len(),
        numbered_problems(problems, 5)
    ))
}

fn numbered_problems(problems: &[String], limit: usize) -> String {
    let mut text = String::new();
    for (i, problem) in problems.iter().take(limit).enumerate() {
        text.push_str(&format!("{}\\. {}\n", i + 1, escape_markdown_v2(problem)));
    }
    if problems.len() > limit {
        text.push_str(&format!("_\\.\\.\\.and {} more_\n", problems.len() - limit));
    }
    text
}

/// 阶段进度消息，例如 "🔍 *Step 1/3:* ..."
pub fn format_step(step: usize, total: usize, description: &str) -> String {
    format!(
        "⏳ *Step {}/{}:* {}\\.\\.\\.",
        step,
        total,
        escape_markdown_v2(description)
    )
}

pub fn format_transcription(text: &str) -> String {
    format!(
        "✅ *Transcription:*\n\n_\"{}\"_\n\n🤖 Running AI agent analysis\\.\\.\\.",
        escape_markdown_v2(text)
    )
}

pub fn format_notion_link(url: &str) -> String {
    format!("🔗 *View in Notion:*\n{}", escape_markdown_v2(url))
}

pub fn format_error(detail: &str) -> String {
    format!(
        "❌ Sorry, there was an error processing your message:\n\n{}\n\nPlease try again\\.",
        escape_markdown_v2(detail)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::intake::types::{
        ContactPlatform, Constraints, ExtractionRecord, ResearchItem,
    };
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 7, 9, 30, 0).unwrap()
    }

    fn research_item(title: &str) -> ResearchItem {
        ResearchItem {
            title: title.to_string(),
            url: "https://example.com/a-b".to_string(),
            why_relevant: "fits".to_string(),
            effort: 2,
            impact: 9,
        }
    }

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
        assert_eq!(escape_markdown_v2("a.b!"), "a\\.b\\!");
        assert_eq!(escape_markdown_v2("+1-555-0123"), "\\+1\\-555\\-0123");
        assert_eq!(escape_markdown_v2("[x](y)"), "\\[x\\]\\(y\\)");
        assert_eq!(escape_markdown_v2("back\\slash"), "back\\\\slash");
        assert_eq!(escape_markdown_v2("_*~`>#=|{}"), "\\_\\*\\~\\`\\>\\#\\=\\|\\{\\}");
    }

    #[test]
    fn test_fit_message_keeps_short_text() {
        assert_eq!(fit_message("hello", 4096), "hello");
    }

    #[test]
    fn test_fit_message_caps_length() {
        let long = "a".repeat(5000);
        let fitted = fit_message(&long, 4096);
        assert!(fitted.chars().count() <= 4096);
        assert!(fitted.chars().count() > 4000);
        assert!(fitted.ends_with(TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_fit_message_never_splits_an_escape() {
        let escaped = escape_markdown_v2(&".".repeat(100));
        let fitted = fit_message(&escaped, 20);
        let body = fitted.trim_end_matches(TRUNCATION_SUFFIX);
        let trailing = body.chars().rev().take_while(|c| *c == '\\').count();
        assert_eq!(trailing % 2, 0);
        assert!(fitted.chars().count() <= 20);
    }

    #[test]
    fn test_fit_message_closes_open_entities() {
        let text = format!("*{}* _{}_", "b".repeat(10), "i".repeat(100));
        let fitted = fit_message(&text, 40);
        let body = fitted.trim_end_matches(TRUNCATION_SUFFIX);
        assert!(body.ends_with('_'));
        assert!(open_entities(body).is_empty());
        assert!(fitted.chars().count() <= 40);
    }

    #[test]
    fn test_fit_message_prefers_line_boundary() {
        let text = format!("1\\. *{}*\n2\\. *{}*\n", "a".repeat(30), "b".repeat(30));
        let fitted = fit_message(&text, 50);
        assert_eq!(fitted, format!("1\\. *{}*{}", "a".repeat(30), TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_fit_message_drops_entity_opened_at_the_cut() {
        let text = format!("{} *{}*", "a".repeat(10), "b".repeat(50));
        let fitted = fit_message(&text, 23);
        assert_eq!(fitted, format!("{} {}", "a".repeat(10), TRUNCATION_SUFFIX));
    }

    #[test]
    fn test_escaped_markers_are_not_entities() {
        assert!(open_entities("\\*not bold\\_").is_empty());
        assert_eq!(open_entities("*bold _italic"), vec!['*', '_']);
        assert!(open_entities("*bold* _it_").is_empty());
    }

    #[test]
    fn test_report_escapes_negative_scores() {
        let mut record = ExtractionRecord::with_problems(vec!["x".to_string()]);
        record.research_items = Some(vec![ResearchItem {
            effort: -2,
            impact: 3,
            ..research_item("Zendesk")
        }]);
        let result = PipelineResult::assemble(record, "p".into(), "r".into());

        let message = format_pipeline_report(&result, now(), 4096);
        assert!(message.contains("Impact: 3/10 \\| Effort: \\-2/10"));
        assert!(!message.contains(" -2"));
    }

    #[test]
    fn test_report_contains_escaped_fields() {
        let mut record = ExtractionRecord::with_problems(vec![
            "Support overload (3h/day).".to_string(),
            "Feedback scattered".to_string(),
        ]);
        record.contact_name = Some("Sarah Johnson".to_string());
        record.contact_handle = Some("+1-555-0123".to_string());
        record.contact_platform = Some(ContactPlatform::Whatsapp);
        record.constraints = Some(Constraints {
            budget: Some("$10k".to_string()),
            ..Default::default()
        });
        let result = PipelineResult::assemble(record, "p".into(), "r".into());

        let message = format_pipeline_report(&result, now(), 4096);
        assert!(message.contains("• Name: Sarah Johnson\n"));
        assert!(message.contains("• Handle: \\+1\\-555\\-0123\n"));
        assert!(message.contains("• Platform: whatsapp\n"));
        assert!(message.contains("*Problems Identified* \\(2\\)"));
        assert!(message.contains("1\\. Support overload \\(3h/day\\)\\.\n"));
        assert!(message.contains("• Budget: $10k\n"));
        assert!(!message.contains("Deadline"));
        assert!(!message.contains("Research Items"));
    }

    #[test]
    fn test_report_lists_first_items_only() {
        let problems = (1..=7).map(|i| format!("problem {}", i)).collect();
        let mut record = ExtractionRecord::with_problems(problems);
        record.research_items = Some(vec![
            research_item("A"),
            research_item("B"),
            research_item("C"),
            research_item("D"),
        ]);
        let result = PipelineResult::assemble(record, "p".into(), "r".into());

        let message = format_pipeline_report(&result, now(), 4096);
        assert!(message.contains("5\\. problem 5"));
        assert!(!message.contains("problem 6"));
        assert!(message.contains("_\\.\\.\\.and 2 more_"));
        assert!(message.contains("3\\. *C*"));
        assert!(!message.contains("*D*"));
        assert!(message.contains("_\\.\\.\\.and 1 more_"));
        assert!(message.contains("Impact: 9/10 \\| Effort: 2/10"));
        assert!(message.contains("Name: Unknown"));
    }

    #[test]
    fn test_report_is_capped() {
        let record = ExtractionRecord::with_problems(vec!["x".repeat(3000); 5]);
        let result = PipelineResult::assemble(record, "p".into(), "r".into());

        let message = format_pipeline_report(&result, now(), 4096);
        assert!(message.chars().count() <= 4096);
    }

    #[test]
    fn test_problem_preview() {
        assert!(format_problem_preview(&[]).is_none());
        let preview = format_problem_preview(&["slow onboarding".to_string()]).unwrap();
        assert!(preview.starts_with("✅ *Problems Identified:* 1"));
        assert!(preview.contains("1\\. slow onboarding"));
    }
}

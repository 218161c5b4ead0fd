//! 把流水线结果转换成Notion页面属性和内容块

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::generator::intake::types::{InputSource, PipelineResult};

/// Notion接口的文本长度与数量限制
pub struct NotionLimits;

impl NotionLimits {
    pub const RICH_TEXT: usize = 2000;
    pub const URL: usize = 2000;
    pub const HANDLE: usize = 200;
    pub const TITLE: usize = 100;
    pub const SHORT_TEXT: usize = 200;
    pub const LONG_TEXT: usize = 500;
    pub const WHY_RELEVANT: usize = 1500;
    pub const MAX_PROBLEMS: usize = 50;
    pub const MAX_PRIORITIES: usize = 50;
    pub const MAX_RESEARCH_ITEMS: usize = 20;
    pub const SPLIT_NOTICE_THRESHOLD: usize = 5;
}

/// 创建页面所需的属性与内容块
#[derive(Debug, Clone, Serialize)]
pub struct NotionPage {
    pub properties: Value,
    pub children: Vec<Value>,
}

/// 超长时保留前 `max-3` 个字符并追加 "..."
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

/// 按换行、句点、空格的优先级把长文本切成多段
pub fn split_text_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut position = 0;
    while position < chars.len() {
        let end = position + max_chars;
        if end >= chars.len() {
            chunks.push(chars[position..].iter().collect());
            break;
        }

        let window = &chars[position..end];
        let break_point = last_index_of(window, &['\n'])
            .filter(|i| *i > 0)
            .or_else(|| {
                last_index_of(window, &['.', ' '])
                    .filter(|i| *i > 0)
                    .map(|i| i + 2)
            })
            .or_else(|| last_index_of(window, &[' ']).filter(|i| *i > 0))
            .map(|i| position + i)
            .unwrap_or(end);

        chunks.push(chars[position..break_point].iter().collect());
        position = break_point;
    }
    chunks
}

/// 在窗口内查找模式最后一次出现的位置
fn last_index_of(window: &[char], pattern: &[char]) -> Option<usize> {
    if pattern.len() > window.len() {
        return None;
    }
    (0..=window.len() - pattern.len())
        .rev()
        .find(|&i| window[i..i + pattern.len()] == *pattern)
}

fn rich_text(content: &str) -> Value {
    json!({ "rich_text": [{ "text": { "content": content } }] })
}

fn heading(level: u8, content: &str) -> Value {
    let kind = format!("heading_{}", level);
    let mut block = json!({ "object": "block", "type": &kind });
    block[kind.as_str()] = rich_text(content);
    block
}

fn paragraph(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": rich_text(content),
    })
}

fn bullet(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "bulleted_list_item",
        "bulleted_list_item": rich_text(content),
    })
}

fn note(content: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [{
                "text": { "content": content },
                "annotations": { "italic": true, "color": "gray" }
            }]
        }
    })
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// 构建页面：属性用于数据库列，内容块用于页面正文
pub fn build_page(
    result: &PipelineResult,
    source: InputSource,
    local_file: Option<&str>,
    now: DateTime<Utc>,
) -> NotionPage {
    let report = &result.full_report;
    let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);

    let title = report
        .contact_name
        .as_deref()
        .filter(|s| !s.is_empty())
        .or(report.company.as_deref().filter(|s| !s.is_empty()))
        .unwrap_or("New Contact");

    let mut properties = json!({
        "Name": { "title": [{ "text": { "content": truncate_text(title, NotionLimits::TITLE) } }] },
    });

    if let Some(company) = &report.company {
        properties["Company"] = rich_text(&truncate_text(company, NotionLimits::SHORT_TEXT));
    }
    if let Some(handle) = &report.contact_handle {
        properties["Contact Handle"] = rich_text(&truncate_text(handle, NotionLimits::HANDLE));
    }
    if let Some(platform) = report.contact_platform {
        properties["Platform"] = json!({ "select": { "name": capitalize(&platform.to_string()) } });
    }
    if !report.problems.is_empty() {
        properties["Problems Count"] = json!({ "number": report.problems.len() });
    }
    if let Some(constraints) = &report.constraints {
        let fields = [
            ("Budget", &constraints.budget, NotionLimits::SHORT_TEXT),
            ("Deadline", &constraints.deadline, NotionLimits::SHORT_TEXT),
            ("Team Size", &constraints.team_size, NotionLimits::SHORT_TEXT),
            ("Tech Stack", &constraints.stack, NotionLimits::LONG_TEXT),
        ];
        for (name, value, limit) in fields {
            if let Some(value) = value {
                properties[name] = rich_text(&truncate_text(value, limit));
            }
        }
    }
    let research_items = report.research_items();
    if let Some(top) = research_items.first() {
        properties["Research Count"] = json!({ "number": research_items.len().min(100) });
        properties["Top Solution"] = rich_text(&truncate_text(&top.title, NotionLimits::SHORT_TEXT));
    }
    properties["Source"] = json!({ "select": { "name": capitalize(&source.to_string()) } });
    properties["Status"] = json!({ "status": { "name": "New" } });
    properties["Created At"] = json!({ "date": { "start": timestamp } });
    if let Some(local_file) = local_file {
        properties["Local File"] = rich_text(&truncate_text(local_file, NotionLimits::LONG_TEXT));
    }
    if !report.problems.is_empty() {
        let summary = report.problems.iter().take(3).cloned().collect::<Vec<_>>().join("; ");
        properties["Problems"] = rich_text(&truncate_text(&summary, NotionLimits::LONG_TEXT));
    }

    let mut children = Vec::new();

    if !report.problems.is_empty() {
        children.push(heading(2, "🚨 Problems Identified"));
        for problem in report.problems.iter().take(NotionLimits::MAX_PROBLEMS) {
            children.push(bullet(&truncate_text(problem, NotionLimits::RICH_TEXT)));
        }
        if report.problems.len() > NotionLimits::MAX_PROBLEMS {
            children.push(note(&format!(
                "... and {} more problems (see local file for full list)",
                report.problems.len() - NotionLimits::MAX_PROBLEMS
            )));
        }
    }

    if let Some(constraints) = &report.constraints {
        children.push(heading(2, "📋 Constraints"));
        let lines: Vec<String> = [
            ("💰 Budget", &constraints.budget, NotionLimits::SHORT_TEXT),
            ("⏰ Deadline", &constraints.deadline, NotionLimits::SHORT_TEXT),
            ("👥 Team Size", &constraints.team_size, NotionLimits::SHORT_TEXT),
            ("🔧 Tech Stack", &constraints.stack, NotionLimits::LONG_TEXT),
        ]
        .into_iter()
        .filter_map(|(label, value, limit)| {
            value
                .as_ref()
                .map(|v| format!("{}: {}", label, truncate_text(v, limit)))
        })
        .collect();
        if !lines.is_empty() {
            children.push(paragraph(&truncate_text(&lines.join("\n"), NotionLimits::RICH_TEXT)));
        }
    }

    let priorities = report.priorities();
    if !priorities.is_empty() {
        children.push(heading(2, "🎯 Priorities"));
        for priority in priorities.iter().take(NotionLimits::MAX_PRIORITIES) {
            let text = format!(
                "{} (Impact: {}/10, Effort: {}/10)",
                priority.summary, priority.impact, priority.effort
            );
            children.push(bullet(&truncate_text(&text, NotionLimits::RICH_TEXT)));
        }
        if priorities.len() > NotionLimits::MAX_PRIORITIES {
            children.push(note(&format!(
                "... and {} more priorities",
                priorities.len() - NotionLimits::MAX_PRIORITIES
            )));
        }
    }

    if !research_items.is_empty() {
        children.push(heading(2, "🔍 Research Items"));
        for item in research_items.iter().take(NotionLimits::MAX_RESEARCH_ITEMS) {
            children.push(heading(3, &truncate_text(&item.title, NotionLimits::SHORT_TEXT)));

            let url = truncate_text(&item.url, NotionLimits::URL);
            let details = format!(
                "🔗 URL: {}\n💡 Why Relevant: {}\n📊 Impact: {}/10 | Effort: {}/10",
                url,
                truncate_text(&item.why_relevant, NotionLimits::WHY_RELEVANT),
                item.impact,
                item.effort
            );
            let mut text = json!({ "content": truncate_text(&details, NotionLimits::RICH_TEXT) });
            if url.starts_with("http") {
                text["link"] = json!({ "url": url });
            }
            children.push(json!({
                "object": "block",
                "type": "paragraph",
                "paragraph": { "rich_text": [{ "text": text }] },
            }));
        }
        if research_items.len() > NotionLimits::MAX_RESEARCH_ITEMS {
            children.push(note(&format!(
                "... and {} more research items (see local file)",
                research_items.len() - NotionLimits::MAX_RESEARCH_ITEMS
            )));
        }
    }

    if let Some(report_markdown) = report.report_markdown.as_deref().filter(|s| !s.is_empty()) {
        children.push(heading(2, "📝 Full Report"));
        let chunks = split_text_into_chunks(report_markdown, NotionLimits::RICH_TEXT);
        for chunk in &chunks {
            children.push(paragraph(chunk));
        }
        if chunks.len() > NotionLimits::SPLIT_NOTICE_THRESHOLD {
            children.push(note(&format!(
                "(Report split into {} sections due to length. See local file for complete report.)",
                chunks.len()
            )));
        }
    }

    children.push(json!({ "object": "block", "type": "divider", "divider": {} }));
    children.push(json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [{
                "text": {
                    "content": format!(
                        "Generated by VoiceFast Agent\nSource: {}\nTimestamp: {}",
                        source, timestamp
                    )
                },
                "annotations": { "color": "gray" }
            }]
        }
    }));

    NotionPage {
        properties,
        children,
    }
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

    fn result_with(record: ExtractionRecord) -> PipelineResult {
        PipelineResult::assemble(record, "prompt".into(), "results".into())
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("exactly10!", 10), "exactly10!");
        assert_eq!(truncate_text("this is too long", 10), "this is...");
        assert_eq!(truncate_text("ééééééééééé", 10).chars().count(), 10);
    }

    #[test]
    fn test_split_prefers_newline() {
        let text = format!("{}\n{}", "a".repeat(8), "b".repeat(8));
        let chunks = split_text_into_chunks(&text, 10);
        assert_eq!(chunks[0], "a".repeat(8));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_split_keeps_sentence_end() {
        let text = "One two. Three four five six";
        let chunks = split_text_into_chunks(text, 12);
        assert_eq!(chunks[0], "One two. ");
        assert_eq!(chunks.concat(), text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 12));
    }

    #[test]
    fn test_split_falls_back_to_space_then_hard_cut() {
        let chunks = split_text_into_chunks("alpha beta gamma", 8);
        assert_eq!(chunks[0], "alpha");
        assert_eq!(chunks.concat(), "alpha beta gamma");

        let hard = split_text_into_chunks(&"x".repeat(25), 10);
        assert_eq!(hard, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn test_split_short_text_is_single_chunk() {
        assert_eq!(split_text_into_chunks("hello", 2000), vec!["hello".to_string()]);
    }

    #[test]
    fn test_properties_for_full_record() {
        let mut record = ExtractionRecord::with_problems(vec![
            "p1".to_string(),
            "p2".to_string(),
            "p3".to_string(),
            "p4".to_string(),
        ]);
        record.contact_name = Some("Sarah Johnson".to_string());
        record.company = Some("TechStart Inc".to_string());
        record.contact_platform = Some(ContactPlatform::Whatsapp);
        record.constraints = Some(Constraints {
            budget: Some("$10k".to_string()),
            stack: Some("Node.js, React".to_string()),
            ..Default::default()
        });
        record.research_items = Some(vec![ResearchItem {
            title: "Zendesk".to_string(),
            url: "https://zendesk.com".to_string(),
            why_relevant: "ticket triage".to_string(),
            effort: 4,
            impact: 8,
        }]);

        let page = build_page(&result_with(record), InputSource::Voice, Some("out.json"), now());
        let props = &page.properties;

        assert_eq!(props["Name"]["title"][0]["text"]["content"], "Sarah Johnson");
        assert_eq!(props["Platform"]["select"]["name"], "Whatsapp");
        assert_eq!(props["Problems Count"]["number"], 4);
        assert_eq!(props["Budget"]["rich_text"][0]["text"]["content"], "$10k");
        assert!(props.get("Deadline").is_none());
        assert_eq!(props["Tech Stack"]["rich_text"][0]["text"]["content"], "Node.js, React");
        assert_eq!(props["Research Count"]["number"], 1);
        assert_eq!(props["Top Solution"]["rich_text"][0]["text"]["content"], "Zendesk");
        assert_eq!(props["Source"]["select"]["name"], "Voice");
        assert_eq!(props["Status"]["status"]["name"], "New");
        assert_eq!(props["Created At"]["date"]["start"], "2025-10-07T09:30:00.000Z");
        assert_eq!(props["Local File"]["rich_text"][0]["text"]["content"], "out.json");
        assert_eq!(props["Problems"]["rich_text"][0]["text"]["content"], "p1; p2; p3");

        let link = page
            .children
            .iter()
            .find_map(|block| block["paragraph"]["rich_text"][0]["text"]["link"]["url"].as_str());
        assert_eq!(link, Some("https://zendesk.com"));
    }

    #[test]
    fn test_title_fallbacks() {
        let page = build_page(
            &result_with(ExtractionRecord::with_problems(vec![])),
            InputSource::Text,
            None,
            now(),
        );
        assert_eq!(page.properties["Name"]["title"][0]["text"]["content"], "New Contact");
        assert!(page.properties.get("Problems Count").is_none());
        assert!(page.properties.get("Local File").is_none());
        assert_eq!(page.properties["Source"]["select"]["name"], "Text");
        // 只有分隔线和页脚
        assert_eq!(page.children.len(), 2);

        let mut record = ExtractionRecord::with_problems(vec![]);
        record.company = Some("Acme".to_string());
        let page = build_page(&result_with(record), InputSource::Text, None, now());
        assert_eq!(page.properties["Name"]["title"][0]["text"]["content"], "Acme");
    }

    #[test]
    fn test_problem_list_is_capped_with_notice() {
        let problems = (0..60).map(|i| format!("problem {}", i)).collect();
        let page = build_page(
            &result_with(ExtractionRecord::with_problems(problems)),
            InputSource::Text,
            None,
            now(),
        );

        let bullets = page
            .children
            .iter()
            .filter(|block| block["type"] == "bulleted_list_item")
            .count();
        assert_eq!(bullets, 50);
        assert!(page.children.iter().any(|block| {
            block["paragraph"]["rich_text"][0]["text"]["content"]
                == "... and 10 more problems (see local file for full list)"
        }));
    }

    #[test]
    fn test_long_report_is_split_with_notice() {
        let mut record = ExtractionRecord::with_problems(vec![]);
        record.report_markdown = Some("word ".repeat(2500));
        let page = build_page(&result_with(record), InputSource::Text, None, now());

        let over_limit = page.children.iter().any(|block| {
            block["paragraph"]["rich_text"][0]["text"]["content"]
                .as_str()
                .is_some_and(|s| s.chars().count() > NotionLimits::RICH_TEXT)
        });
        assert!(!over_limit);
        assert!(page.children.iter().any(|block| {
            block["paragraph"]["rich_text"][0]["text"]["content"]
                .as_str()
                .is_some_and(|s| s.starts_with("(Report split into 7 sections"))
        }));
    }
}
